//! Genome synthesis.
//!
//! Every sequence produced here is net-stack-neutral: it pushes exactly as
//! much as it pops and never pops an empty stack. That contract is what
//! lets the mutation engine splice genomes anywhere into a function body
//! without breaking validation.

use quine_core::{Corpus, Genome};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::disasm;
use crate::leb128;
use crate::opcode::{
    self, BLOCK_TYPE_EMPTY, DROP, END, I32_CONST, IF, LOCAL_GET, LOCAL_SET, LOCAL_TEE, NOP,
};

/// Binary operators eligible for fresh `safe_math` genomes. Narrower than
/// the full math set the deleter recognizes: mul is left out to keep
/// logged results small.
const MATH_OPS: [u8; 5] = [
    opcode::I32_ADD,
    opcode::I32_SUB,
    opcode::I32_AND,
    opcode::I32_OR,
    opcode::I32_XOR,
];

/// Hand-picked trivial genomes used as the final fallback.
const BASE_SAFE: [[u8; 3]; 4] = [
    [LOCAL_GET, 0x00, DROP],
    [LOCAL_GET, 0x01, DROP],
    [I32_CONST, 0x00, DROP],
    [I32_CONST, 0x01, DROP],
];

/// `i32.const <v>, drop`
fn const_drop(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let value = rng.gen_range(0u8..128);
    vec![I32_CONST, value, DROP]
}

/// `i32.const <a>, i32.const <b>, <op>, drop`
fn safe_math(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let op = MATH_OPS[rng.gen_range(0..MATH_OPS.len())];
    let a = rng.gen_range(0u8..128);
    let b = rng.gen_range(0u8..128);
    vec![I32_CONST, a, I32_CONST, b, op, DROP]
}

/// `i32.const <v>, local.tee 0, drop`
///
/// The constant is varint-encoded, so values of 128 and above produce a
/// two-byte operand. Exercises local storage without disturbing the stack.
fn local_tee(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let value = rng.gen_range(0u32..255);
    let mut seq = vec![I32_CONST];
    seq.extend(leb128::encode(value));
    seq.extend_from_slice(&[LOCAL_TEE, 0x00, DROP]);
    seq
}

/// `i32.const 1, if, i32.const <v>, drop, end`
///
/// The condition is always true, so the block body runs and the whole
/// construct nets zero.
fn if_true(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let value = rng.gen_range(0u8..64);
    vec![
        I32_CONST,
        0x01,
        IF,
        BLOCK_TYPE_EMPTY,
        I32_CONST,
        value,
        DROP,
        END,
    ]
}

/// Layered genome selection.
///
/// Once the corpus holds more than two learned genomes, 70% of draws
/// replay one of them uniformly. Otherwise a fresh genome is synthesized:
/// 30% const-drop, 30% safe math, 20% local tee, 15% guarded block, and
/// the remainder from the base-safe fallback table.
pub fn choose_genome(corpus: &Corpus, rng: &mut ChaCha8Rng) -> Genome {
    if corpus.len() > 2 && rng.gen::<f32>() < 0.7 {
        let entries = corpus.entries();
        return entries[rng.gen_range(0..entries.len())].clone();
    }

    let draw = rng.gen::<f32>();
    let bytes = if draw < 0.30 {
        const_drop(rng)
    } else if draw < 0.60 {
        safe_math(rng)
    } else if draw < 0.80 {
        local_tee(rng)
    } else if draw < 0.95 {
        if_true(rng)
    } else {
        BASE_SAFE[rng.gen_range(0..BASE_SAFE.len())].to_vec()
    };
    Genome::new(bytes)
}

/// Net operand-stack delta of a byte sequence under the abstract depth
/// model genomes are certified against.
///
/// Pushes count +1, discards and local writes -1, `local.tee` 0, binary
/// operators -1 (consume two, produce one), `if` consumes its condition,
/// `end` and `nop` are free. Returns `None` when the sequence contains an
/// opcode outside the modeled set, or when the depth dips negative at any
/// prefix. A genome is acceptable exactly when this returns `Some(0)`.
pub fn stack_effect(bytes: &[u8]) -> Option<i32> {
    let mut depth = 0i32;
    for inst in disasm::parse_instructions(bytes) {
        let delta = match inst.opcode {
            I32_CONST | LOCAL_GET => 1,
            DROP | LOCAL_SET => -1,
            LOCAL_TEE | NOP | END => 0,
            IF => -1,
            op if opcode::is_binary_math(op) => -1,
            _ => return None,
        };
        depth += delta;
        if depth < 0 {
            return None;
        }
    }
    Some(depth)
}
