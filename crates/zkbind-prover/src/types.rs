//! Common types for the zkbind prover
//!
//! Defines Proof, its fixed byte layout, PublicInputs and the error types
//! shared by the prover and the verifier.

use thiserror::Error;

use crate::m31::{M31, M31_BYTES};
use crate::merkle::{hash_bytes, Hash, MerklePath, HASH_SIZE};

/// A single opened trace cell: its value and the Merkle siblings up to the root
///
/// The leaf index is not stored; the verifier derives it from the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening {
    pub value: M31,
    pub siblings: Vec<Hash>,
}

impl Opening {
    pub fn from_path(value: M31, path: MerklePath) -> Self {
        Self {
            value,
            siblings: path.siblings,
        }
    }

    /// Authentication path for the given leaf position
    pub fn path(&self, leaf_index: usize) -> MerklePath {
        MerklePath {
            siblings: self.siblings.clone(),
            leaf_index,
        }
    }
}

/// Openings for one query row: `window * num_columns` cells, offset-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOpening {
    pub openings: Vec<Opening>,
}

/// Shape of a serialized proof
///
/// Derived from the verification key, never read from the proof itself, so a
/// proof's length is fully determined by the circuit it was made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofLayout {
    pub num_columns: usize,
    pub merkle_depth: usize,
    pub num_boundary: usize,
    pub num_queries: usize,
    pub window: usize,
}

impl ProofLayout {
    /// Bytes used by one opening
    pub fn opening_size(&self) -> usize {
        M31_BYTES + self.merkle_depth * HASH_SIZE
    }

    pub fn openings_per_query(&self) -> usize {
        self.num_columns * self.window
    }

    /// Exact size of a serialized proof
    pub fn proof_size(&self) -> usize {
        let openings = self.num_boundary + self.num_queries * self.openings_per_query();
        self.num_columns * HASH_SIZE + openings * self.opening_size()
    }
}

/// A proof: trace commitments plus boundary and query openings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    /// Merkle roots for trace column commitments
    pub trace_roots: Vec<Hash>,
    /// Openings for each boundary assertion, in assertion order
    pub boundary_openings: Vec<Opening>,
    /// Openings at each sampled query row
    pub query_openings: Vec<QueryOpening>,
}

impl Proof {
    /// Serialize the proof to bytes
    ///
    /// Layout: roots, then boundary openings, then query openings. Each opening
    /// is a little-endian field element followed by its siblings.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        for root in &self.trace_roots {
            bytes.extend_from_slice(root);
        }

        let openings = self
            .boundary_openings
            .iter()
            .chain(self.query_openings.iter().flat_map(|q| q.openings.iter()));
        for opening in openings {
            bytes.extend_from_slice(&opening.value.to_le_bytes());
            for sibling in &opening.siblings {
                bytes.extend_from_slice(sibling);
            }
        }

        bytes
    }

    /// Parse a proof with the given layout
    ///
    /// Only the length is checked here. Field elements are read raw, so a
    /// non-canonical value survives decoding and is rejected by the verifier.
    pub fn from_bytes(bytes: &[u8], layout: &ProofLayout) -> Result<Self, ProofFormatError> {
        let expected = layout.proof_size();
        if bytes.len() != expected {
            return Err(ProofFormatError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let mut reader = ByteReader::new(bytes);

        let trace_roots = (0..layout.num_columns)
            .map(|_| reader.read_hash())
            .collect::<Result<Vec<_>, _>>()?;

        let boundary_openings = (0..layout.num_boundary)
            .map(|_| reader.read_opening(layout.merkle_depth))
            .collect::<Result<Vec<_>, _>>()?;

        let query_openings = (0..layout.num_queries)
            .map(|_| {
                let openings = (0..layout.openings_per_query())
                    .map(|_| reader.read_opening(layout.merkle_depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryOpening { openings })
            })
            .collect::<Result<Vec<_>, ProofFormatError>>()?;

        Ok(Self {
            trace_roots,
            boundary_openings,
            query_openings,
        })
    }

    /// Proof size in bytes
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProofFormatError> {
        let end = self.offset + len;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(ProofFormatError::Truncated { offset: self.offset })?;
        self.offset = end;
        Ok(slice)
    }

    fn read_hash(&mut self) -> Result<Hash, ProofFormatError> {
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(self.take(HASH_SIZE)?);
        Ok(hash)
    }

    fn read_opening(&mut self, depth: usize) -> Result<Opening, ProofFormatError> {
        let mut raw = [0u8; M31_BYTES];
        raw.copy_from_slice(self.take(M31_BYTES)?);
        let siblings = (0..depth)
            .map(|_| self.read_hash())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Opening {
            value: M31::from_raw_le_bytes(raw),
            siblings,
        })
    }
}

/// Opaque serialized proof handed between synthesis and verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofArtifact(Vec<u8>);

impl ProofArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Proof> for ProofArtifact {
    fn from(proof: Proof) -> Self {
        Self(proof.to_bytes())
    }
}

/// Public inputs to the proof
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicInputs {
    /// Initial state values
    pub initial_state: Vec<M31>,
    /// Final state values
    pub final_state: Vec<M31>,
}

impl PublicInputs {
    /// Create new public inputs
    pub fn new(initial_state: Vec<M31>, final_state: Vec<M31>) -> Self {
        Self {
            initial_state,
            final_state,
        }
    }

    /// Create empty public inputs
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if public inputs are empty
    pub fn is_empty(&self) -> bool {
        self.initial_state.is_empty() && self.final_state.is_empty()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        bytes.extend_from_slice(&(self.initial_state.len() as u32).to_le_bytes());
        for val in &self.initial_state {
            bytes.extend_from_slice(&val.to_le_bytes());
        }

        bytes.extend_from_slice(&(self.final_state.len() as u32).to_le_bytes());
        for val in &self.final_state {
            bytes.extend_from_slice(&val.to_le_bytes());
        }

        bytes
    }

    /// Hash the public inputs
    pub fn hash(&self) -> Hash {
        hash_bytes(&self.to_bytes())
    }
}

/// Proof generation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// Invalid witness
    #[error("Invalid witness: {0}")]
    InvalidWitness(String),
    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// Invalid trace
    #[error("Invalid trace: {0}")]
    InvalidTrace(String),
    /// Keys or configuration do not match the trace
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    /// Merkle error
    #[error("Merkle error: {0}")]
    MerkleError(String),
}

impl ProofError {
    /// Create an invalid witness error
    pub fn invalid_witness(msg: impl Into<String>) -> Self {
        Self::InvalidWitness(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Create an invalid trace error
    pub fn invalid_trace(msg: impl Into<String>) -> Self {
        Self::InvalidTrace(msg.into())
    }

    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}

/// Errors decoding a proof against its layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofFormatError {
    #[error("proof size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("proof truncated at byte {offset}")]
    Truncated { offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ProofLayout {
        ProofLayout {
            num_columns: 2,
            merkle_depth: 3,
            num_boundary: 1,
            num_queries: 2,
            window: 2,
        }
    }

    fn opening(seed: u8, depth: usize) -> Opening {
        Opening {
            value: M31::new(u32::from(seed) * 1000),
            siblings: (0..depth).map(|i| [seed.wrapping_add(i as u8); 32]).collect(),
        }
    }

    fn sample_proof() -> Proof {
        let layout = layout();
        Proof {
            trace_roots: vec![[1u8; 32], [2u8; 32]],
            boundary_openings: vec![opening(3, layout.merkle_depth)],
            query_openings: (0..layout.num_queries)
                .map(|q| QueryOpening {
                    openings: (0..layout.openings_per_query())
                        .map(|i| opening((10 * q + i) as u8, layout.merkle_depth))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_layout_size() {
        let layout = layout();
        // 2 roots + (1 + 2*4) openings of (4 + 3*32) bytes
        assert_eq!(layout.opening_size(), 100);
        assert_eq!(layout.proof_size(), 64 + 9 * 100);
        assert_eq!(sample_proof().size(), layout.proof_size());
    }

    #[test]
    fn test_proof_bytes_follow_layout() {
        let proof = sample_proof();
        let bytes = proof.to_bytes();
        let decoded = Proof::from_bytes(&bytes, &layout()).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_proof_size_mismatch() {
        let mut bytes = sample_proof().to_bytes();
        bytes.push(0);
        assert_eq!(
            Proof::from_bytes(&bytes, &layout()),
            Err(ProofFormatError::SizeMismatch {
                expected: layout().proof_size(),
                actual: layout().proof_size() + 1,
            })
        );
    }

    #[test]
    fn test_non_canonical_value_survives_decoding() {
        let mut bytes = sample_proof().to_bytes();
        // First boundary opening value starts right after the roots
        bytes[64..68].copy_from_slice(&u32::MAX.to_le_bytes());
        let decoded = Proof::from_bytes(&bytes, &layout()).unwrap();
        assert!(!decoded.boundary_openings[0].value.is_canonical());
    }

    #[test]
    fn test_public_inputs_serialization() {
        let inputs = PublicInputs::new(vec![M31::new(100), M31::new(200)], vec![M31::new(300)]);

        // 4 bytes length + 2*4 bytes initial + 4 bytes length + 1*4 bytes final
        assert_eq!(inputs.to_bytes().len(), 4 + 8 + 4 + 4);
        assert!(!inputs.is_empty());
        assert!(PublicInputs::empty().is_empty());
        assert_ne!(inputs.hash(), PublicInputs::empty().hash());
    }

    #[test]
    fn test_proof_error_display() {
        let err = ProofError::invalid_witness("test error");
        assert!(err.to_string().contains("Invalid witness"));

        let err = ProofError::constraint_violation("bad constraint");
        assert!(err.to_string().contains("Constraint violation"));
    }
}
