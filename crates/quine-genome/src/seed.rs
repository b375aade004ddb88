//! Canonical seed kernel image.
//!
//! The boot chain starts from a known-good module whose exported `run`
//! function echoes its `(ptr, len)` argument window back through the
//! imported log function. The host injects the kernel's own source text at
//! offset 0 and calls `run(0, len)`, so echoing the window is exactly what
//! makes the module a quine.

use quine_core::glob;
use wasm_encoder::{
    CodeSection, EntityType, ExportKind, ExportSection, Function, FunctionSection, ImportSection,
    Instruction, MemorySection, MemoryType, Module, TypeSection, ValType,
};

/// Build the seed module: imports `env.log(i32, i32)` and
/// `env.grow_memory(i32)`, one exported memory of one page, and one
/// exported function `run(ptr, len)` with body
/// `local.get 0, local.get 1, call 0, nop`.
pub fn build_seed_kernel() -> Vec<u8> {
    let mut module = Module::new();

    let mut types = TypeSection::new();
    types.function([ValType::I32, ValType::I32], []);
    types.function([ValType::I32], []);
    module.section(&types);

    let mut imports = ImportSection::new();
    imports.import("env", "log", EntityType::Function(0));
    imports.import("env", "grow_memory", EntityType::Function(1));
    module.section(&imports);

    let mut functions = FunctionSection::new();
    functions.function(0);
    module.section(&functions);

    let mut memories = MemorySection::new();
    memories.memory(MemoryType {
        minimum: 1,
        maximum: None,
        memory64: false,
        shared: false,
    });
    module.section(&memories);

    let mut exports = ExportSection::new();
    exports.export("memory", ExportKind::Memory, 0);
    // Function index 2: the two imports occupy indices 0 and 1.
    exports.export("run", ExportKind::Func, 2);
    module.section(&exports);

    let mut code = CodeSection::new();
    let mut run = Function::new(vec![]);
    run.instruction(&Instruction::LocalGet(0));
    run.instruction(&Instruction::LocalGet(1));
    run.instruction(&Instruction::Call(0));
    run.instruction(&Instruction::Nop);
    run.instruction(&Instruction::End);
    code.function(&run);
    module.section(&code);

    module.finish()
}

/// The seed image as a transport glob.
pub fn seed_glob() -> String {
    glob::encode_glob(&build_seed_kernel())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{CALL, END, LOCAL_GET, NOP, WASM_MAGIC, WASM_VERSION};

    /// Reference rendering of the seed image. The byte layout is load-bearing
    /// for the whole system (the quine check compares against this text), so
    /// any encoder change that perturbs it must fail loudly here.
    const SEED_GLOB: &str = "AGFzbQEAAAABCgJgAn9/AGABfwACHQIDZW52A2xvZwAAA2Vudgtncm93X21lbW9yeQABAwIBAAUDAQABBxACBm1lbW9yeQIAA3J1bgACCgsBCQAgACABEAABCw==";

    #[test]
    fn test_seed_glob_is_stable() {
        assert_eq!(seed_glob(), SEED_GLOB);
    }

    #[test]
    fn test_seed_kernel_shape() {
        let bytes = build_seed_kernel();
        assert_eq!(bytes.len(), 91);
        assert_eq!(&bytes[0..4], &WASM_MAGIC);
        assert_eq!(&bytes[4..8], &WASM_VERSION);
        // Body: no locals, echo window, call log, nop, end.
        assert_eq!(
            &bytes[82..91],
            &[0x00, LOCAL_GET, 0x00, LOCAL_GET, 0x01, CALL, 0x00, NOP, END]
        );
    }
}
