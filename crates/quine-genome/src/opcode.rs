//! Binary format constants and opcode predicates.
//!
//! Only the handful of opcodes the mutation scheme handles are named here;
//! anything else flows through the disassembler as an opaque operand-less
//! byte.

/// Magic bytes: \0asm
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// Binary format version 1
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Fixed module preamble length (magic + version) the locator skips.
pub const HEADER_LEN: usize = 8;

// Section IDs
pub const CODE_SECTION_ID: u8 = 0x0A;

// Block types
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

// Control instructions
pub const UNREACHABLE: u8 = 0x00;
pub const NOP: u8 = 0x01;
pub const IF: u8 = 0x04;
pub const END: u8 = 0x0B;
pub const CALL: u8 = 0x10;

// Parametric instructions
pub const DROP: u8 = 0x1A;

// Variable instructions
pub const LOCAL_GET: u8 = 0x20;
pub const LOCAL_SET: u8 = 0x21;
pub const LOCAL_TEE: u8 = 0x22;

// Numeric instructions
pub const I32_CONST: u8 = 0x41;
pub const I32_ADD: u8 = 0x6A;
pub const I32_SUB: u8 = 0x6B;
pub const I32_MUL: u8 = 0x6C;
pub const I32_AND: u8 = 0x71;
pub const I32_OR: u8 = 0x72;
pub const I32_XOR: u8 = 0x73;

/// Opcodes the disassembler decodes a single varint operand for. Everything
/// else is treated as operand-less, which is deliberately permissive for
/// the minimal module shapes the engine targets.
pub fn has_varint_operand(opcode: u8) -> bool {
    matches!(opcode, I32_CONST | LOCAL_GET | LOCAL_SET | LOCAL_TEE | CALL)
}

/// Two-operand arithmetic/bitwise ops the delete matcher recognizes.
///
/// Wider than the set the synthesizer draws from: `i32.mul` is prunable
/// even though no generator emits it, so corpus genomes of foreign origin
/// still get cleaned up.
pub fn is_binary_math(opcode: u8) -> bool {
    matches!(
        opcode,
        I32_ADD | I32_SUB | I32_MUL | I32_AND | I32_OR | I32_XOR
    )
}

/// Mnemonic for display. Unknown opcodes render as uppercase hex.
pub fn name(opcode: u8) -> String {
    match opcode {
        UNREACHABLE => "unreachable".to_string(),
        NOP => "nop".to_string(),
        END => "end".to_string(),
        DROP => "drop".to_string(),
        LOCAL_GET => "local.get".to_string(),
        LOCAL_SET => "local.set".to_string(),
        LOCAL_TEE => "local.tee".to_string(),
        I32_CONST => "i32.const".to_string(),
        CALL => "call".to_string(),
        other => format!("0x{:X}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_bearing_set() {
        assert!(has_varint_operand(I32_CONST));
        assert!(has_varint_operand(LOCAL_GET));
        assert!(has_varint_operand(LOCAL_SET));
        assert!(has_varint_operand(LOCAL_TEE));
        assert!(has_varint_operand(CALL));
        assert!(!has_varint_operand(NOP));
        assert!(!has_varint_operand(DROP));
        assert!(!has_varint_operand(I32_ADD));
    }

    #[test]
    fn test_binary_math_includes_mul() {
        assert!(is_binary_math(I32_ADD));
        assert!(is_binary_math(I32_MUL));
        assert!(is_binary_math(I32_XOR));
        assert!(!is_binary_math(DROP));
        assert!(!is_binary_math(I32_CONST));
    }

    #[test]
    fn test_names() {
        assert_eq!(name(NOP), "nop");
        assert_eq!(name(I32_CONST), "i32.const");
        assert_eq!(name(IF), "0x4");
        assert_eq!(name(BLOCK_TYPE_EMPTY), "0x40");
        assert_eq!(name(I32_ADD), "0x6A");
    }
}
