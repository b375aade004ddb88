//! Module locator: derives instruction-stream offsets from raw bytes.

use crate::leb128;
use crate::opcode::{CODE_SECTION_ID, HEADER_LEN};
use quine_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Byte offsets into one module image, derived fresh per mutation attempt.
///
/// Invariant: `code_section_content_start <= func_content_start <=
/// instruction_start <= func_end - 1 <= buffer length`. The byte at
/// `func_end - 1` is the function's block terminator; it is excluded from
/// the decoded instruction stream and re-appended verbatim on reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLayout {
    /// Offset of the code section's id byte.
    pub code_section_start: usize,
    /// First byte of the code section content, after the size prefix.
    pub code_section_content_start: usize,
    /// Offset of the function-body size varint.
    pub func_body_size_offset: usize,
    /// First byte of the function body, after the size prefix.
    pub func_content_start: usize,
    /// First byte of the instruction stream, after the local declarations.
    pub instruction_start: usize,
    /// One past the last byte of the function body.
    pub func_end: usize,
}

impl ModuleLayout {
    /// Walk the section records to the code section and derive all offsets.
    ///
    /// The walk starts after the fixed 8-byte preamble and advances by
    /// `1 + size-varint length + size` per section. Exactly one function
    /// body is supported; anything else is an unsupported module shape.
    pub fn locate(bytes: &[u8]) -> Result<Self> {
        let mut ptr = HEADER_LEN;
        let mut code_section_start = None;
        let mut code_section_content_start = 0;

        while ptr < bytes.len() {
            let id = bytes[ptr];
            let size = leb128::decode(bytes, ptr + 1);
            if id == CODE_SECTION_ID {
                code_section_start = Some(ptr);
                code_section_content_start = ptr + 1 + size.length;
                let content_end = code_section_content_start + size.value as usize;
                if content_end > bytes.len() {
                    return Err(Error::ModuleShape(format!(
                        "code section claims {} bytes but only {} remain",
                        size.value,
                        bytes.len() - code_section_content_start.min(bytes.len())
                    )));
                }
                break;
            }
            ptr += 1 + size.length + size.value as usize;
        }

        let code_section_start = code_section_start
            .ok_or_else(|| Error::ModuleShape("code section missing".to_string()))?;

        let num_funcs = leb128::decode(bytes, code_section_content_start);
        if num_funcs.length == 0 {
            return Err(Error::ModuleShape(
                "code section truncated before function count".to_string(),
            ));
        }
        if num_funcs.value != 1 {
            return Err(Error::ModuleShape(format!(
                "expected exactly 1 function body, found {}",
                num_funcs.value
            )));
        }

        let func_body_size_offset = code_section_content_start + num_funcs.length;
        let body_size = leb128::decode(bytes, func_body_size_offset);
        if body_size.length == 0 || body_size.value == 0 {
            return Err(Error::ModuleShape(
                "function body size missing or zero".to_string(),
            ));
        }

        let func_content_start = func_body_size_offset + body_size.length;
        let func_end = func_content_start + body_size.value as usize;
        if func_end > bytes.len() {
            return Err(Error::ModuleShape(format!(
                "function body ends at {} past buffer length {}",
                func_end,
                bytes.len()
            )));
        }

        let local_groups = leb128::decode(bytes, func_content_start);
        let mut cursor = func_content_start + local_groups.length;
        for _ in 0..local_groups.value {
            if cursor >= func_end {
                return Err(Error::ModuleShape(
                    "local declarations overrun function body".to_string(),
                ));
            }
            let count = leb128::decode(bytes, cursor);
            cursor += count.length + 1; // count varint plus one type byte
        }

        let instruction_start = cursor;
        if instruction_start > func_end - 1 {
            return Err(Error::ModuleShape(
                "instruction stream starts past function terminator".to_string(),
            ));
        }

        Ok(Self {
            code_section_start,
            code_section_content_start,
            func_body_size_offset,
            func_content_start,
            instruction_start,
            func_end,
        })
    }

    /// Everything up to and including the code section id byte.
    pub fn before_code_section<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[..self.code_section_start + 1]
    }

    /// The function-count varint bytes, reused verbatim on reassembly.
    pub fn func_count_bytes<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.code_section_content_start..self.func_body_size_offset]
    }

    /// The local-declarations prefix of the function body.
    pub fn locals_prefix<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.func_content_start..self.instruction_start]
    }

    /// The instruction stream, terminator excluded.
    pub fn instruction_stream<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.instruction_start..self.func_end - 1]
    }

    /// The function's block terminator byte.
    pub fn terminator(&self, bytes: &[u8]) -> u8 {
        bytes[self.func_end - 1]
    }

    /// Bytes after the function body, outside the code section content.
    pub fn tail<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.func_end..]
    }
}
