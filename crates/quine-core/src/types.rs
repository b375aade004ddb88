//! Core type definitions for the kernel lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural edit applied to the kernel's instruction stream.
///
/// The mapping from attempt counter to action is fixed; callers rely on
/// cycling through all four kinds across consecutive attempts. `Modify` is
/// an alias of `Insert`: rewriting an opcode in place can change encoded
/// lengths unpredictably, so the engine performs an insertion instead and
/// reports it under the original action name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Modify,
    Insert,
    Append,
    Delete,
}

impl ActionKind {
    pub fn from_attempt(attempt: u64) -> Self {
        match attempt % 4 {
            0 => ActionKind::Modify,
            1 => ActionKind::Insert,
            2 => ActionKind::Append,
            _ => ActionKind::Delete,
        }
    }

    /// Both `Modify` and `Insert` splice a genome into the stream.
    pub fn is_insertion(&self) -> bool {
        matches!(self, ActionKind::Modify | ActionKind::Insert)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Modify => "MODIFY",
            ActionKind::Insert => "INSERT",
            ActionKind::Append => "APPEND",
            ActionKind::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// A short, stack-neutral instruction byte sequence used as an atomic
/// mutation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome(pub Vec<u8>);

impl Genome {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Genome {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Result of one mutation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// The reconstructed binary, size prefixes recomputed.
    pub binary: Vec<u8>,
    /// The genome that was spliced in, absent for delete actions.
    pub genome: Option<Genome>,
    /// The action kind that was applied.
    pub action: ActionKind,
    /// Human-readable summary suitable for direct display.
    pub description: String,
}

/// Bootloader lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemState {
    Idle,
    Booting,
    LoadingKernel,
    Executing,
    VerifyingQuine,
    Repairing,
    Halted,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemState::Idle => "IDLE",
            SystemState::Booting => "BOOTING",
            SystemState::LoadingKernel => "LOADING_KERNEL",
            SystemState::Executing => "EXECUTING",
            SystemState::VerifyingQuine => "VERIFYING_QUINE",
            SystemState::Repairing => "REPAIRING",
            SystemState::Halted => "SYSTEM_HALT",
        };
        write!(f, "{}", name)
    }
}

/// Evolutionary epoch, derived from the generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemEra {
    Primordial,
    Expansion,
    Complexity,
    Singularity,
}

impl SystemEra {
    pub fn from_generation(generation: u64) -> Self {
        if generation < 5 {
            SystemEra::Primordial
        } else if generation < 15 {
            SystemEra::Expansion
        } else if generation < 30 {
            SystemEra::Complexity
        } else {
            SystemEra::Singularity
        }
    }
}

impl fmt::Display for SystemEra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemEra::Primordial => "PRIMORDIAL",
            SystemEra::Expansion => "EXPANSION",
            SystemEra::Complexity => "COMPLEXITY",
            SystemEra::Singularity => "SINGULARITY",
        };
        write!(f, "{}", name)
    }
}

/// One line of the exportable system history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
    pub kernel_size: usize,
    pub action: String,
    pub details: String,
    pub success: bool,
}

impl HistoryEntry {
    pub fn new(
        generation: u64,
        kernel_size: usize,
        action: impl Into<String>,
        details: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            generation,
            timestamp: Utc::now(),
            kernel_size,
            action: action.into(),
            details: details.into(),
            success,
        }
    }
}
