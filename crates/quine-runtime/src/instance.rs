//! Kernel instance management.

use crate::io::KernelIo;
use quine_core::{Error, Result, RuntimeLimits};
use wasmtime::*;

const WASM_PAGE_BYTES: usize = 65536;

/// A booted kernel instance
pub struct KernelInstance {
    store: Store<KernelIo>,
    memory: Memory,
    run_func: TypedFunc<(i32, i32), ()>,
    limits: RuntimeLimits,
}

impl KernelInstance {
    pub fn new(
        engine: &Engine,
        wasm_bytes: &[u8],
        io: KernelIo,
        limits: RuntimeLimits,
    ) -> Result<Self> {
        let module = Module::new(engine, wasm_bytes)
            .map_err(|e| Error::Wasm(format!("Failed to compile module: {}", e)))?;

        let mut linker = Linker::new(engine);
        io.add_to_linker(&mut linker)
            .map_err(|e| Error::Wasm(format!("Failed to add host functions: {}", e)))?;

        let mut store = Store::new(engine, io);
        store
            .set_fuel(limits.max_fuel)
            .map_err(|e| Error::Wasm(format!("Failed to set fuel: {}", e)))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| Error::Wasm(format!("Failed to instantiate: {}", e)))?;

        // Get the kernel's exports
        let run_func = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, "run")
            .map_err(|e| Error::Wasm(format!("Failed to get run function: {}", e)))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| Error::Wasm("Kernel exports no memory".to_string()))?;

        Ok(Self {
            store,
            memory,
            run_func,
            limits,
        })
    }

    /// Write a source text at offset 0 and run the kernel over it.
    ///
    /// Returns whatever the kernel pushed through `env.log` during the
    /// call. A faithful kernel echoes the source window back verbatim.
    pub fn run_echo(&mut self, source: &[u8]) -> Result<Vec<u8>> {
        if source.len() > self.limits.max_memory_bytes {
            return Err(Error::ResourceExhausted(format!(
                "Source is {} bytes, memory limit is {}",
                source.len(),
                self.limits.max_memory_bytes
            )));
        }

        // Reset fuel for this run
        self.store
            .set_fuel(self.limits.max_fuel)
            .map_err(|e| Error::Wasm(format!("Failed to set fuel: {}", e)))?;

        let current = self.memory.data_size(&self.store);
        if source.len() > current {
            let delta = (source.len() - current).div_ceil(WASM_PAGE_BYTES) as u64;
            self.memory
                .grow(&mut self.store, delta)
                .map_err(|e| Error::Wasm(format!("Failed to grow memory: {}", e)))?;
        }

        self.memory
            .write(&mut self.store, 0, source)
            .map_err(|e| Error::Wasm(format!("Failed to write source: {}", e)))?;

        // Discard anything a previous run left behind.
        self.store.data().take_output();

        self.run_func
            .call(&mut self.store, (0, source.len() as i32))
            .map_err(|e| {
                // Check if we ran out of fuel
                if let Some(trap) = e.downcast_ref::<Trap>() {
                    if matches!(trap, Trap::OutOfFuel) {
                        return Error::ResourceExhausted("Out of fuel".to_string());
                    }
                }
                Error::Wasm(format!("Run function failed: {}", e))
            })?;

        let output = self.store.data().take_output();
        tracing::debug!(
            fuel = self.fuel_consumed(),
            echoed = output.len(),
            "kernel run complete"
        );
        Ok(output)
    }

    /// Self-reproduction check: does the kernel echo this source exactly?
    pub fn reproduces(&mut self, source: &[u8]) -> Result<bool> {
        let echoed = self.run_echo(source)?;
        Ok(echoed == source)
    }

    /// Get the fuel consumed in the last execution
    pub fn fuel_consumed(&self) -> u64 {
        self.limits.max_fuel - self.store.get_fuel().unwrap_or(0)
    }

    /// Get reference to the shared I/O state
    pub fn io(&self) -> &KernelIo {
        self.store.data()
    }
}
