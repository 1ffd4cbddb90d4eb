//! Fiat-Shamir transcript
//!
//! Prover and verifier feed the same messages in the same order and draw the
//! same challenges.

use crate::m31::M31;
use crate::merkle::{hash_bytes, hash_parts, Hash};

const TRANSCRIPT_DOMAIN: &[u8] = b"zkbind-transcript-v1";

/// Transcript for Fiat-Shamir transformation
#[derive(Clone, Debug)]
pub struct Transcript {
    state: Hash,
    counter: u64,
}

impl Transcript {
    /// Create a new transcript
    pub fn new() -> Self {
        Self {
            state: hash_bytes(TRANSCRIPT_DOMAIN),
            counter: 0,
        }
    }

    /// Append a digest to the transcript
    pub fn append(&mut self, data: &Hash) {
        self.state = hash_parts(&[&self.state, data]);
    }

    /// Get a challenge scalar
    pub fn challenge_scalar(&mut self) -> M31 {
        self.counter += 1;
        let hash = hash_parts(&[&self.state, &self.counter.to_le_bytes()]);
        let value = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]);
        M31::new(value)
    }

    /// Get multiple challenge scalars
    pub fn challenge_scalars(&mut self, count: usize) -> Vec<M31> {
        (0..count).map(|_| self.challenge_scalar()).collect()
    }

    /// Get distinct challenge indices in `0..max`
    ///
    /// At most `max` indices are returned.
    pub fn challenge_indices(&mut self, count: usize, max: usize) -> Vec<usize> {
        let count = count.min(max);
        let mut indices = Vec::with_capacity(count);

        while indices.len() < count {
            let scalar = self.challenge_scalar();
            let index = (scalar.value() as usize) % max;

            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        indices
    }

    /// Get current state hash
    pub fn state(&self) -> Hash {
        self.state
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_deterministic() {
        let mut transcript1 = Transcript::new();
        let mut transcript2 = Transcript::new();

        let hash = hash_bytes(b"test data");
        transcript1.append(&hash);
        transcript2.append(&hash);

        assert_eq!(transcript1.state(), transcript2.state());
        assert_eq!(transcript1.challenge_scalar(), transcript2.challenge_scalar());
    }

    #[test]
    fn test_transcript_different_inputs() {
        let mut transcript1 = Transcript::new();
        let mut transcript2 = Transcript::new();

        transcript1.append(&hash_bytes(b"data1"));
        transcript2.append(&hash_bytes(b"data2"));

        assert_ne!(transcript1.challenge_scalar(), transcript2.challenge_scalar());
    }

    #[test]
    fn test_challenge_indices() {
        let mut transcript = Transcript::new();
        let indices = transcript.challenge_indices(10, 100);

        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&idx| idx < 100));

        let mut sorted = indices.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
    }

    #[test]
    fn test_challenge_indices_clamped_to_domain() {
        let mut transcript = Transcript::new();
        let mut indices = transcript.challenge_indices(50, 6);
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
