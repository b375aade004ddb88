//! Base64 transport encoding for kernel images.
//!
//! The kernel travels between the session, the snapshot store, and the
//! execution host as a "glob": the standard padded base64 rendering of the
//! module bytes. The quine check compares the kernel's output against this
//! text, so encoding must be stable across the whole system.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

pub fn encode_glob(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_glob(glob: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(glob)
        .map_err(|e| Error::Glob(format!("invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        let glob = encode_glob(&bytes);
        assert_eq!(glob, "AGFzbQEAAAA=");
        assert_eq!(decode_glob(&glob).unwrap(), bytes);
    }

    #[test]
    fn test_invalid_glob() {
        let err = decode_glob("not@valid@base64").unwrap_err();
        assert!(matches!(err, Error::Glob(_)));
    }

    #[test]
    fn test_empty() {
        assert_eq!(encode_glob(&[]), "");
        assert_eq!(decode_glob("").unwrap(), Vec::<u8>::new());
    }
}
