//! Proof verification
//!
//! The verifier checks proofs without knowing the witness. A proof that parses
//! against the key's layout but fails any check is rejected with `Ok(false)`;
//! an error means the check itself could not be carried out.

use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::air::{compose_row, ConstraintEvaluator, EvaluationFrame};
use crate::keys::VerificationKey;
use crate::m31::M31;
use crate::merkle::{hash_leaf, Hash};
use crate::prover::seed_transcript;
use crate::types::{Opening, Proof, ProofError, ProofFormatError, PublicInputs};

/// Verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The artifact does not match the key's proof layout
    #[error("malformed proof: {0}")]
    Format(#[from] ProofFormatError),
    /// Key and circuit disagree
    #[error("verification key does not match circuit: {0}")]
    KeyMismatch(String),
    /// Public inputs cannot be turned into boundary assertions
    #[error("invalid public inputs: {0}")]
    PublicInputs(#[from] ProofError),
}

/// Why a well-formed proof was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// An opened value is not a canonical field element
    NonCanonicalValue,
    /// Boundary opening holds the wrong value
    BoundaryValue { index: usize },
    /// Boundary opening does not authenticate against its column root
    BoundaryPath { index: usize },
    /// Query opening does not authenticate against its column root
    QueryPath { row: usize, column: usize },
    /// Composed transition constraint does not vanish
    Constraint { row: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonCanonicalValue => write!(f, "non-canonical field element"),
            Self::BoundaryValue { index } => {
                write!(f, "boundary assertion {} not satisfied", index)
            }
            Self::BoundaryPath { index } => {
                write!(f, "boundary opening {} has an invalid path", index)
            }
            Self::QueryPath { row, column } => {
                write!(f, "opening at row {} column {} has an invalid path", row, column)
            }
            Self::Constraint { row } => write!(f, "composed constraint non-zero at row {}", row),
        }
    }
}

/// Outcome of a completed check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Verifier for spot-check proofs
#[derive(Clone, Debug, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify serialized proof bytes
    pub fn verify<E: ConstraintEvaluator + ?Sized>(
        &self,
        vk: &VerificationKey,
        evaluator: &E,
        proof_bytes: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<bool, VerificationError> {
        let verdict = self.check(vk, evaluator, proof_bytes, public_inputs)?;
        if let Verdict::Rejected(reason) = verdict {
            debug!(%reason, "proof rejected");
        }
        Ok(verdict.is_accepted())
    }

    /// Verify and report the first failed check
    #[instrument(skip_all, fields(circuit = vk.circuit_id(), len = proof_bytes.len()))]
    pub fn check<E: ConstraintEvaluator + ?Sized>(
        &self,
        vk: &VerificationKey,
        evaluator: &E,
        proof_bytes: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<Verdict, VerificationError> {
        if evaluator.circuit_id() != vk.circuit_id()
            || evaluator.num_columns() != vk.num_columns()
            || evaluator.window() != vk.window()
            || evaluator.constraints().len() != vk.num_constraints()
        {
            return Err(VerificationError::KeyMismatch(format!(
                "key is for {:?}, evaluator is {:?}",
                vk.circuit_id(),
                evaluator.circuit_id()
            )));
        }

        let assertions = evaluator.boundary_assertions(public_inputs, vk.num_rows())?;
        if assertions.len() != vk.num_boundary() {
            return Err(VerificationError::KeyMismatch(format!(
                "public inputs produce {} boundary assertions, key expects {}",
                assertions.len(),
                vk.num_boundary()
            )));
        }

        // Step 1: Parse against the key's layout
        let proof = Proof::from_bytes(proof_bytes, &vk.layout())?;
        if !all_canonical(&proof) {
            return Ok(Verdict::Rejected(Rejection::NonCanonicalValue));
        }

        // Step 2: Rebuild transcript
        let mut transcript = seed_transcript(vk, public_inputs, &proof.trace_roots);
        let coefficients = transcript.challenge_scalars(vk.num_constraints());
        let query_rows = transcript.challenge_indices(vk.num_queries(), vk.transition_rows());

        // Step 3: Boundary openings
        let boundary = assertions.iter().zip(&proof.boundary_openings);
        for (index, (assertion, opening)) in boundary.enumerate() {
            if opening.value != assertion.value {
                return Ok(Verdict::Rejected(Rejection::BoundaryValue { index }));
            }
            if !authenticates(opening, assertion.row, &proof.trace_roots[assertion.column]) {
                return Ok(Verdict::Rejected(Rejection::BoundaryPath { index }));
            }
        }

        // Step 4: Query windows
        let width = vk.num_columns();
        for (&row, query) in query_rows.iter().zip(&proof.query_openings) {
            for (i, opening) in query.openings.iter().enumerate() {
                let (offset, column) = (i / width, i % width);
                if !authenticates(opening, row + offset, &proof.trace_roots[column]) {
                    return Ok(Verdict::Rejected(Rejection::QueryPath {
                        row: row + offset,
                        column,
                    }));
                }
            }

            let values = query.openings.iter().map(|o| o.value).collect();
            let frame = EvaluationFrame::new(values, width);
            let evals = evaluator.evaluate(&frame);
            if !compose_row(&evals, &coefficients, vk.row_weight(row)).is_zero() {
                return Ok(Verdict::Rejected(Rejection::Constraint { row }));
            }
        }

        Ok(Verdict::Accepted)
    }
}

fn all_canonical(proof: &Proof) -> bool {
    proof
        .boundary_openings
        .iter()
        .chain(proof.query_openings.iter().flat_map(|q| q.openings.iter()))
        .all(|o| o.value.is_canonical())
}

fn authenticates(opening: &Opening, row: usize, root: &Hash) -> bool {
    opening.path(row).verify(&hash_leaf(opening.value), root)
}

/// Verify that a value is in a committed column
pub fn verify_membership(value: M31, row: usize, siblings: &[Hash], root: &Hash) -> bool {
    let opening = Opening {
        value,
        siblings: siblings.to_vec(),
    };
    value.is_canonical() && authenticates(&opening, row, root)
}
