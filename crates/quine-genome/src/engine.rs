//! Mutation and reassembly engine.
//!
//! One call takes a complete module image, applies a single structural
//! edit to its instruction stream, and emits a fresh image with both
//! length prefixes recomputed. The transform is pure: the input buffer is
//! never modified, and all randomness comes from the injected generator.

use quine_core::{ActionKind, Corpus, Error, Genome, MutationOutcome, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::disasm::{self, Instruction};
use crate::layout::ModuleLayout;
use crate::leb128;
use crate::opcode::{self, DROP, END, I32_CONST, IF, LOCAL_GET, LOCAL_TEE, NOP};
use crate::synthesis;

/// Hard cap on the rebuilt function body, local declarations and
/// terminator included. Growth past this point is rejected wholesale
/// rather than trimmed.
pub const MAX_FUNC_BODY_LEN: usize = 32768;

struct Edit {
    stream: Vec<u8>,
    genome: Option<Genome>,
    description: String,
}

/// Apply one mutation attempt to a module image.
///
/// The action cycles deterministically with the attempt counter
/// (modify, insert, append, delete); genome and position selection within
/// the action are random. Returns the rebuilt image together with the
/// applied genome (if any) and a display description. The input is left
/// untouched on every path, including errors.
pub fn mutate(
    bytes: &[u8],
    corpus: &Corpus,
    attempt: u64,
    rng: &mut ChaCha8Rng,
) -> Result<MutationOutcome> {
    let layout = ModuleLayout::locate(bytes)?;
    let instructions = disasm::parse_instructions(layout.instruction_stream(bytes));
    let action = ActionKind::from_attempt(attempt);

    let edit = match action {
        ActionKind::Modify => insert_genome(&instructions, corpus, action, rng),
        ActionKind::Insert => insert_genome(&instructions, corpus, action, rng),
        ActionKind::Append => append_genome(&instructions, corpus, rng),
        ActionKind::Delete => delete_construct(&instructions, rng),
    };

    let binary = reassemble(bytes, &layout, &edit.stream)?;
    Ok(MutationOutcome {
        binary,
        genome: edit.genome,
        action,
        description: edit.description,
    })
}

/// Splice a genome into the stream at a chosen instruction boundary.
///
/// In-place opcode rewriting is unsafe here (it can change encoded
/// lengths unpredictably), so the modify action performs an insertion as
/// well; only the description differs. 70% of draws bias the insertion
/// point into the back half of the stream, past the seed's echo call.
fn insert_genome(
    instructions: &[Instruction],
    corpus: &Corpus,
    action: ActionKind,
    rng: &mut ChaCha8Rng,
) -> Edit {
    let genome = synthesis::choose_genome(corpus, rng);

    let idx = if rng.gen::<f32>() > 0.3 {
        let min = instructions.len() / 2;
        rng.gen_range(min..=instructions.len())
    } else {
        rng.gen_range(0..=instructions.len())
    };

    let mut stream = disasm::flatten(&instructions[..idx]);
    stream.extend_from_slice(genome.as_bytes());
    stream.extend(disasm::flatten(&instructions[idx..]));

    let summary = disasm::describe_sequence(genome.as_bytes());
    let description = match action {
        ActionKind::Modify => format!("Modified: Inserted [{summary}] at {idx}"),
        _ => format!("Inserted [{summary}] at offset {idx}"),
    };

    Edit {
        stream,
        genome: Some(genome),
        description,
    }
}

/// Place a genome after the last instruction.
fn append_genome(instructions: &[Instruction], corpus: &Corpus, rng: &mut ChaCha8Rng) -> Edit {
    let genome = synthesis::choose_genome(corpus, rng);

    let mut stream = disasm::flatten(instructions);
    stream.extend_from_slice(genome.as_bytes());

    let description = format!("Appended [{}]", disasm::describe_sequence(genome.as_bytes()));
    Edit {
        stream,
        genome: Some(genome),
        description,
    }
}

/// Remove one balanced construct, searched in strict priority order.
///
/// Single no-ops go first, then const-const-op-drop quadruples, then
/// guarded conditional blocks, then any producer immediately followed by
/// a drop. The middle two categories are additionally gated by a coin
/// flip, so a lower-priority target can win even when a higher one
/// exists. Arbitrary single-instruction deletion is not offered: it
/// cannot be guaranteed stack-balanced.
fn delete_construct(instructions: &[Instruction], rng: &mut ChaCha8Rng) -> Edit {
    if instructions.is_empty() {
        return Edit {
            stream: Vec::new(),
            genome: None,
            description: "Instruction set empty".to_string(),
        };
    }

    let nops: Vec<usize> = indices_where(instructions, |w, idx| w[idx].opcode == NOP);
    let target = if !nops.is_empty() {
        let idx = nops[rng.gen_range(0..nops.len())];
        Some((idx, 1, format!("Deleted NOP at index {idx}")))
    } else {
        let quads = math_quadruples(instructions);
        if !quads.is_empty() && rng.gen::<f32>() < 0.6 {
            let idx = quads[rng.gen_range(0..quads.len())];
            let op_name = opcode::name(instructions[idx + 2].opcode);
            Some((idx, 4, format!("Pruned math sequence [{op_name}]")))
        } else {
            let blocks = guarded_blocks(instructions);
            if !blocks.is_empty() && rng.gen::<f32>() < 0.5 {
                let idx = blocks[rng.gen_range(0..blocks.len())];
                Some((idx, 5, "Pruned control flow block".to_string()))
            } else {
                let pairs = producer_drop_pairs(instructions);
                if pairs.is_empty() {
                    None
                } else {
                    let idx = pairs[rng.gen_range(0..pairs.len())];
                    let name = opcode::name(instructions[idx].opcode);
                    Some((idx, 2, format!("Deleted balanced pair [{name}, drop]")))
                }
            }
        }
    };

    match target {
        Some((idx, count, description)) => {
            let mut kept = instructions.to_vec();
            kept.drain(idx..idx + count);
            Edit {
                stream: disasm::flatten(&kept),
                genome: None,
                description,
            }
        }
        None => {
            tracing::debug!("no balanced construct to remove; stream left unchanged");
            Edit {
                stream: disasm::flatten(instructions),
                genome: None,
                description: "No safe deletion targets found (Skipped)".to_string(),
            }
        }
    }
}

fn indices_where<F>(instructions: &[Instruction], pred: F) -> Vec<usize>
where
    F: Fn(&[Instruction], usize) -> bool,
{
    (0..instructions.len())
        .filter(|&idx| pred(instructions, idx))
        .collect()
}

/// `const, const, <binary op>, drop` starting positions.
fn math_quadruples(instructions: &[Instruction]) -> Vec<usize> {
    indices_where(instructions, |w, idx| {
        idx + 3 < w.len()
            && w[idx].opcode == I32_CONST
            && w[idx + 1].opcode == I32_CONST
            && opcode::is_binary_math(w[idx + 2].opcode)
            && w[idx + 3].opcode == DROP
    })
}

/// `const 1, if, _, _, end` starting positions.
fn guarded_blocks(instructions: &[Instruction]) -> Vec<usize> {
    indices_where(instructions, |w, idx| {
        idx + 4 < w.len()
            && w[idx].opcode == I32_CONST
            && w[idx].operand_value() == Some(1)
            && w[idx + 1].opcode == IF
            && w[idx + 4].opcode == END
    })
}

/// Producer immediately followed by a drop.
fn producer_drop_pairs(instructions: &[Instruction]) -> Vec<usize> {
    indices_where(instructions, |w, idx| {
        idx + 1 < w.len()
            && matches!(w[idx].opcode, I32_CONST | LOCAL_GET | LOCAL_TEE)
            && w[idx + 1].opcode == DROP
    })
}

/// Rebuild the full image around a replacement instruction stream.
///
/// The function body is the locals prefix, the new stream, and the
/// original terminator; its size varint and the enclosing code-section
/// size varint are re-encoded from scratch since either can change
/// length. Bytes before the code section and after the function body are
/// carried over untouched.
fn reassemble(bytes: &[u8], layout: &ModuleLayout, stream: &[u8]) -> Result<Vec<u8>> {
    let locals = layout.locals_prefix(bytes);
    let body_len = locals.len() + stream.len() + 1;
    if body_len > MAX_FUNC_BODY_LEN {
        return Err(Error::SizeLimit(format!(
            "function body would be {body_len} bytes, limit is {MAX_FUNC_BODY_LEN}"
        )));
    }

    let body_size = leb128::encode(body_len as u32);
    let func_count = layout.func_count_bytes(bytes);
    let section_len = func_count.len() + body_size.len() + body_len;
    let section_size = leb128::encode(section_len as u32);

    let prefix = layout.before_code_section(bytes);
    let tail = layout.tail(bytes);

    let mut out =
        Vec::with_capacity(prefix.len() + section_size.len() + section_len + tail.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(&section_size);
    out.extend_from_slice(func_count);
    out.extend_from_slice(&body_size);
    out.extend_from_slice(locals);
    out.extend_from_slice(stream);
    out.push(layout.terminator(bytes));
    out.extend_from_slice(tail);
    Ok(out)
}
