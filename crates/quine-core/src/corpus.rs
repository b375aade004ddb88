//! Learned corpus of previously accepted genomes.

use crate::types::Genome;
use serde::{Deserialize, Serialize};

const NOP: u8 = 0x01;

/// Append-only collection of genomes that survived a verified generation.
///
/// The corpus is owned by the boot session and passed read-only into the
/// synthesizer, which draws from it to re-apply mutations that already
/// proved themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    entries: Vec<Genome>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a genome after a verified generation.
    ///
    /// Bare single-nop genomes are skipped so the corpus only accumulates
    /// patterns with some structure, and exact duplicates are skipped so
    /// re-application does not skew the draw distribution. Returns whether
    /// the genome was actually added.
    pub fn commit(&mut self, genome: Genome) -> bool {
        if genome.as_bytes() == [NOP] {
            return false;
        }
        if self.entries.iter().any(|g| g == &genome) {
            return false;
        }
        self.entries.push(genome);
        true
    }

    pub fn entries(&self) -> &[Genome] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_appends() {
        let mut corpus = Corpus::new();
        assert!(corpus.commit(Genome::new(vec![0x41, 0x05, 0x1A])));
        assert!(corpus.commit(Genome::new(vec![0x20, 0x00, 0x1A])));
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.entries()[0].as_bytes(), &[0x41, 0x05, 0x1A]);
    }

    #[test]
    fn test_commit_skips_duplicates() {
        let mut corpus = Corpus::new();
        assert!(corpus.commit(Genome::new(vec![0x41, 0x05, 0x1A])));
        assert!(!corpus.commit(Genome::new(vec![0x41, 0x05, 0x1A])));
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_commit_skips_bare_nop() {
        let mut corpus = Corpus::new();
        assert!(!corpus.commit(Genome::new(vec![0x01])));
        assert!(corpus.is_empty());
        // A nop inside a longer genome is fine
        assert!(corpus.commit(Genome::new(vec![0x01, 0x01])));
    }

    #[test]
    fn test_corpus_serialization() {
        let mut corpus = Corpus::new();
        corpus.commit(Genome::new(vec![0x41, 0x02, 0x1A]));
        let bytes = bincode::serialize(&corpus).unwrap();
        let restored: Corpus = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.entries()[0], corpus.entries()[0]);
    }
}
