//! Proof generation
//!
//! The prover commits to every trace column, draws constraint coefficients and
//! query rows from the transcript, and opens the boundary cells plus a window
//! of rows around each query.

use tracing::{debug, instrument};

use crate::air::{
    compose_constraints, verify_boundary, verify_constraints, ConstraintEvaluator, EvaluationFrame,
    Trace,
};
use crate::keys::{ProvingKey, VerificationKey};
use crate::merkle::{Hash, MerkleCommitment};
use crate::transcript::Transcript;
use crate::types::{Opening, Proof, ProofError, PublicInputs, QueryOpening};

/// Prover configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProverConfig {
    /// Security parameter (number of queries)
    pub num_queries: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self { num_queries: 50 }
    }
}

impl ProverConfig {
    /// Create a new prover config
    pub fn new(num_queries: usize) -> Self {
        Self { num_queries }
    }

    /// High security configuration
    pub fn high_security() -> Self {
        Self::new(100)
    }

    /// Fast configuration (lower security)
    pub fn fast() -> Self {
        Self::new(25)
    }
}

/// Spot-check prover over Merkle-committed traces
#[derive(Clone, Debug, Default)]
pub struct Prover;

impl Prover {
    pub fn new() -> Self {
        Self
    }

    /// Generate a proof for the given trace and constraints
    #[instrument(
        skip_all,
        fields(circuit = pk.verification_key().circuit_id(), rows = trace.num_rows)
    )]
    pub fn prove<E: ConstraintEvaluator + ?Sized>(
        &self,
        pk: &ProvingKey,
        evaluator: &E,
        trace: &Trace,
        public_inputs: &PublicInputs,
    ) -> Result<Proof, ProofError> {
        let vk = pk.verification_key();
        trace.validate()?;
        if trace.num_rows != vk.num_rows() || trace.num_columns() != vk.num_columns() {
            return Err(ProofError::invalid_parameters(format!(
                "trace is {}x{}, key expects {}x{}",
                trace.num_rows,
                trace.num_columns(),
                vk.num_rows(),
                vk.num_columns()
            )));
        }

        // Step 1: Check the witness satisfies the circuit
        let assertions = evaluator.boundary_assertions(public_inputs, trace.num_rows)?;
        if assertions.len() != vk.num_boundary() {
            return Err(ProofError::invalid_parameters(format!(
                "public inputs produce {} boundary assertions, key expects {}",
                assertions.len(),
                vk.num_boundary()
            )));
        }
        verify_boundary(trace, &assertions)?;
        verify_constraints(evaluator, trace).map_err(|failures| {
            let (row, name) = &failures[0];
            ProofError::constraint_violation(format!(
                "{} failed at row {} ({} violations)",
                name,
                row,
                failures.len()
            ))
        })?;

        // Step 2: Commit to trace columns
        let commitments = commit_trace(trace);
        let trace_roots: Vec<Hash> = commitments.iter().map(|c| c.root()).collect();

        // Step 3: Draw coefficients and query rows
        let mut transcript = seed_transcript(vk, public_inputs, &trace_roots);
        let coefficients = transcript.challenge_scalars(vk.num_constraints());
        let query_rows = transcript.challenge_indices(vk.num_queries(), vk.transition_rows());
        debug!(queries = query_rows.len(), "sampled query rows");

        // Step 4: Composition must vanish on every queried row
        let window = evaluator.window();
        let frames = query_rows
            .iter()
            .map(|&row| {
                EvaluationFrame::from_trace(trace, row, window)
                    .ok_or_else(|| ProofError::invalid_trace(format!("no frame at row {}", row)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let evals: Vec<_> = frames.iter().map(|f| evaluator.evaluate(f)).collect();
        let weights: Vec<_> = query_rows.iter().map(|&row| vk.row_weight(row)).collect();
        let composition = compose_constraints(&evals, &coefficients, &weights);
        if let Some(i) = composition.iter().position(|c| !c.is_zero()) {
            return Err(ProofError::invalid_witness(format!(
                "composition does not vanish at row {}",
                query_rows[i]
            )));
        }

        // Step 5: Open boundary cells and query windows
        let boundary_openings = assertions
            .iter()
            .map(|a| open(&commitments, a.column, a.row))
            .collect::<Result<Vec<_>, _>>()?;

        let query_openings = query_rows
            .iter()
            .map(|&row| {
                let mut openings = Vec::with_capacity(window * commitments.len());
                for offset in 0..window {
                    for column in 0..commitments.len() {
                        openings.push(open(&commitments, column, row + offset)?);
                    }
                }
                Ok(QueryOpening { openings })
            })
            .collect::<Result<Vec<_>, ProofError>>()?;

        let proof = Proof {
            trace_roots,
            boundary_openings,
            query_openings,
        };
        debug!(size = proof.size(), "proof generated");
        Ok(proof)
    }
}

/// Commit to all trace columns
fn commit_trace(trace: &Trace) -> Vec<MerkleCommitment> {
    trace
        .columns
        .iter()
        .map(|col| MerkleCommitment::commit(&col.values))
        .collect()
}

fn open(
    commitments: &[MerkleCommitment],
    column: usize,
    row: usize,
) -> Result<Opening, ProofError> {
    let (value, path) = commitments
        .get(column)
        .and_then(|c| c.open(row))
        .ok_or_else(|| {
            ProofError::MerkleError(format!("cannot open row {} of column {}", row, column))
        })?;
    Ok(Opening::from_path(value, path))
}

/// Transcript state shared by prover and verifier up to the first challenge
pub(crate) fn seed_transcript(
    vk: &VerificationKey,
    public_inputs: &PublicInputs,
    trace_roots: &[Hash],
) -> Transcript {
    let mut transcript = Transcript::new();
    transcript.append(&vk.digest());
    transcript.append(&public_inputs.hash());
    for root in trace_roots {
        transcript.append(root);
    }
    transcript
}
