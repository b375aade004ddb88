//! Core types and utilities for the Quine-WASM self-reproducing kernel system.

pub mod config;
pub mod corpus;
pub mod error;
pub mod glob;
pub mod types;

pub use config::*;
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use types::*;
