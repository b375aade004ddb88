//! Binary-module codec and structural mutation engine.
//!
//! Operates on a fixed-shape WASM binary: one imported two-argument log
//! function, one imported single-argument grow function, one exported
//! function body. The pipeline is:
//! - locate the code section and the function's instruction stream from
//!   raw bytes (nested varint-length-prefixed records),
//! - disassemble the stream losslessly (operand bytes kept verbatim),
//! - splice in or prune short stack-neutral instruction sequences,
//! - reassemble a complete binary with both size prefixes recomputed.
//!
//! Every edit the engine produces keeps the operand stack balanced, which
//! is what lets mutated kernels keep passing module validation.

pub mod disasm;
pub mod engine;
pub mod layout;
pub mod leb128;
pub mod opcode;
pub mod seed;
pub mod synthesis;

pub use disasm::{parse_instructions, Instruction};
pub use engine::{mutate, MAX_FUNC_BODY_LEN};
pub use layout::ModuleLayout;
pub use seed::{build_seed_kernel, seed_glob};
pub use synthesis::{choose_genome, stack_effect};
