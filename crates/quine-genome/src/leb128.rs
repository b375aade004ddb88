//! Unsigned LEB128 varint codec.
//!
//! Every section and function body in the module format is length-prefixed
//! with a base-128 continuation-coded integer, so this codec underpins both
//! the locator walk and the reassembly arithmetic. `encode` emits the
//! minimal form only: a module carrying padded varints in a field the
//! engine rewrites would not round-trip byte-identically. The seed builder
//! is the only encoder upstream of the engine and always emits minimal
//! form.

use serde::{Deserialize, Serialize};

/// Result of decoding one varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub value: u32,
    /// Bytes consumed. Zero when the offset was at or past the end of the
    /// buffer; for a varint truncated by the end of the buffer, exactly the
    /// bytes that were available.
    pub length: usize,
}

/// Decode one varint starting at `offset`.
pub fn decode(bytes: &[u8], offset: usize) -> Decoded {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let mut count: usize = 0;

    while offset + count < bytes.len() {
        let byte = bytes[offset + count];
        if shift < 32 {
            value |= u32::from(byte & 0x7F) << shift;
        }
        shift += 7;
        count += 1;
        if byte & 0x80 == 0 {
            break;
        }
    }

    Decoded {
        value,
        length: count,
    }
}

/// Encode a value in minimal form. Zero encodes as the single byte `0x00`.
pub fn encode(value: u32) -> Vec<u8> {
    if value == 0 {
        return vec![0x00];
    }
    let mut bytes = Vec::new();
    let mut rest = value;
    while rest != 0 {
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode(0), vec![0x00]);
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_decode_at_offset() {
        let bytes = [0xFF, 0xAC, 0x02, 0x05];
        let d = decode(&bytes, 1);
        assert_eq!(d.value, 300);
        assert_eq!(d.length, 2);
    }

    #[test]
    fn test_decode_at_buffer_end() {
        let bytes = [0x01, 0x02];
        assert_eq!(decode(&bytes, 2).length, 0);
        assert_eq!(decode(&bytes, 7).length, 0);
        assert_eq!(decode(&[], 0).length, 0);
    }

    #[test]
    fn test_decode_truncated_continuation() {
        // High bit set on the last available byte: consume what is there
        // and stop, reporting exactly the bytes consumed.
        let d = decode(&[0x80], 0);
        assert_eq!(d.length, 1);
        assert_eq!(d.value, 0);

        let d = decode(&[0xAC, 0x82], 0);
        assert_eq!(d.length, 2);
    }

    #[test]
    fn test_decode_does_not_overrun_width() {
        // Six continuation groups exceed 32 bits of payload; the extra
        // groups are consumed but contribute nothing.
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
        let d = decode(&bytes, 0);
        assert_eq!(d.length, 6);
        assert_eq!(d.value, 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip(value in any::<u32>()) {
            let encoded = encode(value);
            let decoded = decode(&encoded, 0);
            prop_assert_eq!(decoded.value, value);
            prop_assert_eq!(decoded.length, encoded.len());
        }

        #[test]
        fn prop_minimal_form(value in 1u32..) {
            let encoded = encode(value);
            // Minimal form never ends in a zero group and never starts a
            // redundant continuation.
            prop_assert!(*encoded.last().unwrap() & 0x80 == 0);
            prop_assert!(encoded.len() <= 5);
            if encoded.len() > 1 {
                prop_assert!(*encoded.last().unwrap() != 0x00);
            }
        }
    }
}
