//! WASM runtime for executing kernel images.
//!
//! This module provides the execution environment for kernels, including:
//! - Host function implementations (kernel ABI: `env.log`, `env.grow_memory`)
//! - Fuel-based execution limits
//! - Memory sandboxing

pub mod instance;
pub mod io;

pub use instance::KernelInstance;
pub use io::KernelIo;

use quine_core::{Error, Result, RuntimeLimits};
use wasmtime::*;

/// The WASM runtime manager
pub struct Runtime {
    engine: Engine,
    limits: RuntimeLimits,
}

impl Runtime {
    pub fn new(limits: RuntimeLimits) -> Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.consume_fuel(true);
        wasm_config.max_wasm_stack(128 * 1024); // 128 KiB stack

        let engine = Engine::new(&wasm_config)
            .map_err(|e| Error::Wasm(format!("Failed to create engine: {}", e)))?;

        Ok(Self { engine, limits })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn limits(&self) -> &RuntimeLimits {
        &self.limits
    }

    /// Check a candidate image against the format and type rules without
    /// instantiating it. Mutated kernels must pass this before adoption.
    pub fn validate(&self, wasm_bytes: &[u8]) -> Result<()> {
        Module::validate(&self.engine, wasm_bytes)
            .map_err(|e| Error::Wasm(format!("Module validation failed: {}", e)))
    }

    /// Create a new kernel instance from WASM bytes
    pub fn instantiate(&self, wasm_bytes: &[u8], io: KernelIo) -> Result<KernelInstance> {
        KernelInstance::new(&self.engine, wasm_bytes, io, self.limits.clone())
    }
}
