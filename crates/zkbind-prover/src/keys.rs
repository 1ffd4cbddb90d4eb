//! Proving and verification keys
//!
//! A key fixes the circuit shape, the number of queries and the reference
//! string prefix whose points weight the composed constraints. Its digest seeds
//! the transcript, so a proof only verifies against the key it was made for.

use thiserror::Error;

use crate::air::ConstraintEvaluator;
use crate::m31::M31;
use crate::merkle::{hash_parts, Hash, HASH_SIZE};
use crate::prover::ProverConfig;
use crate::srs::{ReferenceString, SrsError};
use crate::types::{ProofError, ProofLayout, PublicInputs};

/// Largest supported trace, in log2 rows
pub const MAX_LOG_ROWS: u32 = 24;

const VK_MAGIC: &[u8; 8] = b"ZKBVK001";
const VK_DOMAIN: &[u8] = b"zkbind-vk";

/// Key construction and decoding errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Srs(#[from] SrsError),
    #[error(transparent)]
    Circuit(#[from] ProofError),
    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),
    #[error("malformed verification key: {0}")]
    Format(String),
}

/// Verification key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    circuit_id: String,
    log_rows: u32,
    num_columns: usize,
    window: usize,
    num_constraints: usize,
    num_boundary: usize,
    num_queries: usize,
    srs_digest: Hash,
    row_weights: Vec<M31>,
}

impl VerificationKey {
    /// Derive the key for a circuit of `2^log_rows` rows
    pub fn setup<E: ConstraintEvaluator + ?Sized>(
        evaluator: &E,
        log_rows: u32,
        public_inputs: &PublicInputs,
        config: &ProverConfig,
        srs: &ReferenceString,
    ) -> Result<Self, KeyError> {
        if log_rows == 0 || log_rows > MAX_LOG_ROWS {
            return Err(KeyError::InvalidParameters(format!(
                "log_rows {} outside 1..={}",
                log_rows, MAX_LOG_ROWS
            )));
        }
        let num_rows = 1usize << log_rows;
        let window = evaluator.window();
        if evaluator.num_columns() == 0 || window == 0 || window > num_rows {
            return Err(KeyError::InvalidParameters(format!(
                "{} columns with window {} do not fit {} rows",
                evaluator.num_columns(),
                window,
                num_rows
            )));
        }
        if config.num_queries == 0 {
            return Err(KeyError::InvalidParameters("num_queries must be positive".to_string()));
        }

        let transition_rows = evaluator.transition_rows(num_rows);
        let num_boundary = evaluator.boundary_assertions(public_inputs, num_rows)?.len();

        Ok(Self {
            circuit_id: evaluator.circuit_id().to_string(),
            log_rows,
            num_columns: evaluator.num_columns(),
            window,
            num_constraints: evaluator.constraints().len(),
            num_boundary,
            num_queries: config.num_queries.min(transition_rows),
            srs_digest: srs.prefix_digest(transition_rows)?,
            row_weights: srs.prefix(transition_rows)?.to_vec(),
        })
    }

    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    pub fn log_rows(&self) -> u32 {
        self.log_rows
    }

    pub fn num_rows(&self) -> usize {
        1 << self.log_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    pub fn num_boundary(&self) -> usize {
        self.num_boundary
    }

    /// Queries per proof, capped by the transition domain
    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    /// Rows whose frame is checked by the transition constraints
    pub fn transition_rows(&self) -> usize {
        self.num_rows() - (self.window - 1)
    }

    /// Reference string weight of a transition row
    pub fn row_weight(&self, row: usize) -> M31 {
        self.row_weights.get(row).copied().unwrap_or(M31::ZERO)
    }

    pub fn srs_digest(&self) -> Hash {
        self.srs_digest
    }

    /// Shape of every proof made with this key
    pub fn layout(&self) -> ProofLayout {
        ProofLayout {
            num_columns: self.num_columns,
            merkle_depth: self.log_rows as usize,
            num_boundary: self.num_boundary,
            num_queries: self.num_queries,
            window: self.window,
        }
    }

    pub fn circuit_sizes(&self) -> CircuitSizes {
        CircuitSizes::for_shape(self.log_rows, self.num_columns, self.window)
    }

    /// Serialize the key
    ///
    /// The row weights are not stored; [`VerificationKey::from_bytes`] takes them
    /// from a reference string whose prefix digest must match.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(VK_MAGIC.len() + 4 + self.circuit_id.len() + 24 + HASH_SIZE);
        bytes.extend_from_slice(VK_MAGIC);
        bytes.extend_from_slice(&(self.circuit_id.len() as u32).to_le_bytes());
        bytes.extend_from_slice(self.circuit_id.as_bytes());
        for field in [
            self.log_rows as usize,
            self.num_columns,
            self.window,
            self.num_constraints,
            self.num_boundary,
            self.num_queries,
        ] {
            bytes.extend_from_slice(&(field as u32).to_le_bytes());
        }
        bytes.extend_from_slice(&self.srs_digest);
        bytes
    }

    /// Decode a key, binding it to `srs`
    pub fn from_bytes(bytes: &[u8], srs: &ReferenceString) -> Result<Self, KeyError> {
        let mut cursor = bytes;
        let magic = take(&mut cursor, VK_MAGIC.len())?;
        if magic != VK_MAGIC {
            return Err(KeyError::Format("bad magic".to_string()));
        }
        let id_len = take_u32(&mut cursor)? as usize;
        let circuit_id = String::from_utf8(take(&mut cursor, id_len)?.to_vec())
            .map_err(|_| KeyError::Format("circuit id is not utf-8".to_string()))?;
        let log_rows = take_u32(&mut cursor)?;
        let num_columns = take_u32(&mut cursor)? as usize;
        let window = take_u32(&mut cursor)? as usize;
        let num_constraints = take_u32(&mut cursor)? as usize;
        let num_boundary = take_u32(&mut cursor)? as usize;
        let num_queries = take_u32(&mut cursor)? as usize;
        let mut srs_digest = [0u8; HASH_SIZE];
        srs_digest.copy_from_slice(take(&mut cursor, HASH_SIZE)?);
        if !cursor.is_empty() {
            return Err(KeyError::Format(format!("{} trailing bytes", cursor.len())));
        }

        if log_rows == 0 || log_rows > MAX_LOG_ROWS || window == 0 || window > (1 << log_rows) {
            return Err(KeyError::Format("inconsistent circuit shape".to_string()));
        }
        let transition_rows = (1usize << log_rows) - (window - 1);
        if num_queries == 0 || num_queries > transition_rows {
            return Err(KeyError::Format(format!("query count {} out of range", num_queries)));
        }
        if srs.prefix_digest(transition_rows)? != srs_digest {
            return Err(KeyError::Format(
                "key was derived from a different reference string".to_string(),
            ));
        }

        Ok(Self {
            circuit_id,
            log_rows,
            num_columns,
            window,
            num_constraints,
            num_boundary,
            num_queries,
            srs_digest,
            row_weights: srs.prefix(transition_rows)?.to_vec(),
        })
    }

    /// Digest of the serialized key
    pub fn digest(&self) -> Hash {
        hash_parts(&[VK_DOMAIN, &self.to_bytes()])
    }
}

fn take<'a>(cursor: &mut &'a [u8], len: usize) -> Result<&'a [u8], KeyError> {
    if cursor.len() < len {
        return Err(KeyError::Format("unexpected end of key".to_string()));
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, KeyError> {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(take(cursor, 4)?);
    Ok(u32::from_le_bytes(raw))
}

/// Proving key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvingKey {
    verification_key: VerificationKey,
}

impl ProvingKey {
    pub fn new(verification_key: VerificationKey) -> Self {
        Self { verification_key }
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }
}

/// Circuit size report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitSizes {
    /// Rows checked by transition constraints
    pub exact: u32,
    /// Trace cells
    pub total: u32,
    /// Evaluation domain size
    pub subgroup: u32,
}

impl CircuitSizes {
    /// Sizes of a `2^log_rows` trace with `num_columns` columns and a `window`-row frame
    pub fn for_shape(log_rows: u32, num_columns: usize, window: usize) -> Self {
        let rows = 1u32 << log_rows.min(MAX_LOG_ROWS);
        Self {
            exact: rows.saturating_sub(window.saturating_sub(1) as u32),
            total: rows.saturating_mul(num_columns as u32),
            subgroup: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::{BoundaryAssertion, Constraint, EvaluationFrame};

    struct CounterAir;

    impl ConstraintEvaluator for CounterAir {
        fn circuit_id(&self) -> &str {
            "test-counter"
        }

        fn num_columns(&self) -> usize {
            1
        }

        fn window(&self) -> usize {
            2
        }

        fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
            vec![frame.get(1, 0) - frame.get(0, 0) - M31::ONE]
        }

        fn constraints(&self) -> Vec<Constraint> {
            vec![Constraint::new("increment", 1, vec![0])]
        }

        fn boundary_assertions(
            &self,
            _public_inputs: &PublicInputs,
            _num_rows: usize,
        ) -> Result<Vec<BoundaryAssertion>, ProofError> {
            Ok(vec![BoundaryAssertion::new(0, 0, M31::ZERO)])
        }
    }

    fn srs() -> ReferenceString {
        ReferenceString::generate(64, b"keys").unwrap()
    }

    fn key(log_rows: u32) -> Result<VerificationKey, KeyError> {
        let config = ProverConfig::default();
        VerificationKey::setup(&CounterAir, log_rows, &PublicInputs::empty(), &config, &srs())
    }

    #[test]
    fn test_setup_shape() {
        let vk = key(4).unwrap();
        assert_eq!(vk.num_rows(), 16);
        assert_eq!(vk.transition_rows(), 15);
        // Capped by the transition domain
        assert_eq!(vk.num_queries(), 15);
        assert_eq!(vk.layout().merkle_depth, 4);
        assert_eq!(
            vk.circuit_sizes(),
            CircuitSizes {
                exact: 15,
                total: 16,
                subgroup: 16
            }
        );
    }

    #[test]
    fn test_setup_rejects_small_srs() {
        assert!(matches!(key(7), Err(KeyError::Srs(SrsError::TooSmall { .. }))));
        assert!(matches!(key(0), Err(KeyError::InvalidParameters(_))));
    }

    #[test]
    fn test_bytes_bind_reference_string() {
        let vk = key(5).unwrap();
        let bytes = vk.to_bytes();
        assert_eq!(VerificationKey::from_bytes(&bytes, &srs()).unwrap(), vk);

        let other = ReferenceString::generate(64, b"other").unwrap();
        assert!(matches!(
            VerificationKey::from_bytes(&bytes, &other),
            Err(KeyError::Format(_))
        ));
        assert!(VerificationKey::from_bytes(&bytes[..bytes.len() - 1], &srs()).is_err());
    }

    #[test]
    fn test_digest_depends_on_shape() {
        assert_ne!(key(4).unwrap().digest(), key(5).unwrap().digest());
    }
}
