//! Lossless instruction disassembler.

use crate::leb128;
use crate::opcode;
use serde::{Deserialize, Serialize};

/// One decoded instruction.
///
/// The operand is kept as its verbatim encoded bytes, never as a decoded
/// value: re-emitting `opcode` followed by `operand` reproduces the source
/// bytes exactly, which is what makes disassembly lossless without any
/// opcode-specific re-encoding logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: Vec<u8>,
    /// Position in the buffer this was decoded from. Informational only.
    pub source_offset: usize,
}

impl Instruction {
    /// Encoded length: opcode byte plus operand bytes.
    pub fn encoded_len(&self) -> usize {
        1 + self.operand.len()
    }

    /// Decoded operand value, for display.
    pub fn operand_value(&self) -> Option<u32> {
        if self.operand.is_empty() {
            None
        } else {
            Some(leb128::decode(&self.operand, 0).value)
        }
    }
}

/// Decode a byte range into an ordered instruction sequence.
///
/// Opcodes in the known operand-bearing set carry exactly one varint
/// operand; everything else is treated as operand-less. If the final
/// instruction would extend past the range, its length is clipped to the
/// bytes that remain.
pub fn parse_instructions(bytes: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut ptr = 0;

    while ptr < bytes.len() {
        let op = bytes[ptr];
        let mut len = 1;
        if opcode::has_varint_operand(op) {
            let operand = leb128::decode(bytes, ptr + 1);
            len += operand.length;
        }
        let end = (ptr + len).min(bytes.len());
        instructions.push(Instruction {
            opcode: op,
            operand: bytes[ptr + 1..end].to_vec(),
            source_offset: ptr,
        });
        ptr = end;
    }

    instructions
}

/// Re-serialize an instruction sequence to raw bytes.
pub fn flatten(instructions: &[Instruction]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(instructions.iter().map(|i| i.encoded_len()).sum());
    for inst in instructions {
        bytes.push(inst.opcode);
        bytes.extend_from_slice(&inst.operand);
    }
    bytes
}

/// Render a byte sequence as a comma-separated mnemonic list, with operand
/// values shown for constant pushes and local reads/writes.
pub fn describe_sequence(bytes: &[u8]) -> String {
    parse_instructions(bytes)
        .iter()
        .map(|inst| {
            let with_value = matches!(
                inst.opcode,
                opcode::I32_CONST | opcode::LOCAL_GET | opcode::LOCAL_TEE
            );
            match inst.operand_value() {
                Some(value) if with_value => format!("{} {}", opcode::name(inst.opcode), value),
                _ => opcode::name(inst.opcode),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{CALL, DROP, I32_ADD, I32_CONST, LOCAL_GET, NOP};
    use proptest::prelude::*;

    #[test]
    fn test_parse_seed_stream() {
        let stream = [LOCAL_GET, 0x00, LOCAL_GET, 0x01, CALL, 0x00, NOP];
        let instructions = parse_instructions(&stream);

        assert_eq!(instructions.len(), 4);
        assert_eq!(instructions[0].opcode, LOCAL_GET);
        assert_eq!(instructions[0].operand, vec![0x00]);
        assert_eq!(instructions[0].source_offset, 0);
        assert_eq!(instructions[2].opcode, CALL);
        assert_eq!(instructions[2].source_offset, 4);
        assert_eq!(instructions[3].opcode, NOP);
        assert_eq!(instructions[3].operand, Vec::<u8>::new());
        assert_eq!(instructions[3].encoded_len(), 1);
    }

    #[test]
    fn test_multibyte_operand_kept_verbatim() {
        let stream = [I32_CONST, 0xAC, 0x02, DROP];
        let instructions = parse_instructions(&stream);

        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].operand, vec![0xAC, 0x02]);
        assert_eq!(instructions[0].encoded_len(), 3);
        assert_eq!(instructions[0].operand_value(), Some(300));
        assert_eq!(flatten(&instructions), stream);
    }

    #[test]
    fn test_unknown_opcode_is_operand_less() {
        let instructions = parse_instructions(&[I32_ADD]);
        assert_eq!(instructions.len(), 1);
        assert!(instructions[0].operand.is_empty());
    }

    #[test]
    fn test_truncated_operand_is_clipped() {
        // Const at the very end of the range: no operand bytes available.
        let instructions = parse_instructions(&[NOP, I32_CONST]);
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].operand, Vec::<u8>::new());
        assert_eq!(instructions[1].encoded_len(), 1);

        // Continuation bit set on the last byte: consume what is there.
        let instructions = parse_instructions(&[I32_CONST, 0x80]);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].operand, vec![0x80]);
        assert_eq!(flatten(&instructions), vec![I32_CONST, 0x80]);
    }

    #[test]
    fn test_describe_sequence() {
        assert_eq!(
            describe_sequence(&[I32_CONST, 0x05, DROP]),
            "i32.const 5, drop"
        );
        assert_eq!(
            describe_sequence(&[0x41, 0x01, 0x04, 0x40, 0x41, 0x09, 0x1A, 0x0B]),
            "i32.const 1, 0x4, 0x40, i32.const 9, drop, end"
        );
        assert_eq!(describe_sequence(&[0x20, 0x00, 0x1A]), "local.get 0, drop");
    }

    #[test]
    fn test_instruction_serialization() {
        let inst = Instruction {
            opcode: I32_CONST,
            operand: vec![0x2A],
            source_offset: 7,
        };
        let json = serde_json::to_string(&inst).unwrap();
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inst);
    }

    proptest! {
        /// Disassembly is lossless over arbitrary byte soup, not just
        /// well-formed streams: every byte lands in exactly one
        /// instruction, verbatim.
        #[test]
        fn prop_flatten_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let instructions = parse_instructions(&bytes);
            prop_assert_eq!(flatten(&instructions), bytes);
        }
    }
}
