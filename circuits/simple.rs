//! The "simple" example circuit
//!
//! Column 0 is a Fibonacci sequence `f[i+2] = f[i+1] + f[i]`, column 1 holds
//! `f[i]^2`. The two seeds and the last Fibonacci value are public.
//!
//! A [`SimpleSession`] pairs the builder (trace and public inputs) with the
//! composer (keys derived from the reference string and that same builder).

use thiserror::Error;
use tracing::{debug, instrument};
use zkbind_prover::air::{
    BoundaryAssertion, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn,
};
use zkbind_prover::keys::{CircuitSizes, KeyError, VerificationKey};
use zkbind_prover::pipeline::ProofSystem;
use zkbind_prover::srs::{ReferenceStringProvider, SrsError};
use zkbind_prover::verifier::{Verdict, VerificationError, Verifier};
use zkbind_prover::{Composer, ProofArtifact, ProofError, ProverConfig, PublicInputs, M31};

use crate::session::{SessionTicket, SessionTracker};

/// Identifier bound into verification keys
pub const SIMPLE_CIRCUIT_ID: &str = "zkbind-simple-v1";

/// Smallest trace, in log2 rows
pub const MIN_LOG_ROWS: u32 = 2;

/// Largest trace, in log2 rows
pub const MAX_LOG_ROWS: u32 = 20;

/// Circuit errors
#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("invalid circuit configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Srs(#[from] SrsError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Proof(#[from] ProofError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Parameters of the simple circuit
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimpleCircuitConfig {
    /// Trace length, log2
    pub log_rows: u32,
    /// First Fibonacci seed
    pub first: u32,
    /// Second Fibonacci seed
    pub second: u32,
    /// Output to claim instead of the computed one
    pub claimed_output: Option<u32>,
}

impl Default for SimpleCircuitConfig {
    fn default() -> Self {
        Self {
            log_rows: 6,
            first: 1,
            second: 1,
            claimed_output: None,
        }
    }
}

impl SimpleCircuitConfig {
    pub fn with_log_rows(log_rows: u32) -> Self {
        Self {
            log_rows,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CircuitError> {
        if !(MIN_LOG_ROWS..=MAX_LOG_ROWS).contains(&self.log_rows) {
            return Err(CircuitError::InvalidConfig(format!(
                "log_rows {} outside {}..={}",
                self.log_rows, MIN_LOG_ROWS, MAX_LOG_ROWS
            )));
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        1 << self.log_rows
    }
}

/// Sizes of the simple circuit at `log_rows`, without building it
pub fn circuit_sizes(log_rows: u32) -> Result<CircuitSizes, CircuitError> {
    SimpleCircuitConfig::with_log_rows(log_rows).validate()?;
    Ok(CircuitSizes::for_shape(log_rows, SimpleAir.num_columns(), SimpleAir.window()))
}

/// Check `proof` against a serialized verification key, without a session.
///
/// The key must have been derived from the reference string `provider` serves.
#[instrument(skip_all, fields(vk_len = vk_bytes.len(), proof_len = proof.len()))]
pub fn verify_with_key(
    provider: &dyn ReferenceStringProvider,
    vk_bytes: &[u8],
    proof: &[u8],
    public_inputs: &PublicInputs,
) -> Result<bool, CircuitError> {
    let srs = provider.reference_string(0)?;
    let vk = VerificationKey::from_bytes(vk_bytes, &srs)?;
    debug!(log_rows = vk.log_rows(), "verifying against detached key");
    Ok(Verifier::new().verify(&vk, &SimpleAir, proof, public_inputs)?)
}

/// Constraints of the simple circuit
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleAir;

impl ConstraintEvaluator for SimpleAir {
    fn circuit_id(&self) -> &str {
        SIMPLE_CIRCUIT_ID
    }

    fn num_columns(&self) -> usize {
        2
    }

    fn window(&self) -> usize {
        3
    }

    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
        let f = |offset| frame.get(offset, 0);
        let s = |offset| frame.get(offset, 1);
        vec![
            f(2) - f(1) - f(0),
            s(0) - f(0).square(),
            // Rows past the last frame start are only reachable at offset 2
            s(2) - f(2).square(),
        ]
    }

    fn constraints(&self) -> Vec<Constraint> {
        vec![
            Constraint::new("fibonacci", 1, vec![0]),
            Constraint::new("square", 2, vec![0, 1]),
            Constraint::new("square_tail", 2, vec![0, 1]),
        ]
    }

    fn boundary_assertions(
        &self,
        public_inputs: &PublicInputs,
        num_rows: usize,
    ) -> Result<Vec<BoundaryAssertion>, ProofError> {
        match (public_inputs.initial_state.as_slice(), public_inputs.final_state.as_slice()) {
            ([first, second], [output]) => Ok(vec![
                BoundaryAssertion::new(0, 0, *first),
                BoundaryAssertion::new(0, 1, *second),
                BoundaryAssertion::new(0, num_rows - 1, *output),
            ]),
            (initial, fin) => Err(ProofError::invalid_witness(format!(
                "expected 2 initial and 1 final value, got {} and {}",
                initial.len(),
                fin.len()
            ))),
        }
    }
}

/// Circuit description plus witness
#[derive(Debug)]
pub struct SimpleCircuitBuilder {
    config: SimpleCircuitConfig,
    trace: Trace,
    public_inputs: PublicInputs,
}

impl SimpleCircuitBuilder {
    /// Generate the witness for `config`
    pub fn new(config: SimpleCircuitConfig) -> Result<Self, CircuitError> {
        config.validate()?;
        let n = config.num_rows();

        let mut fib = Vec::with_capacity(n);
        fib.push(M31::new(config.first));
        fib.push(M31::new(config.second));
        for i in 2..n {
            fib.push(fib[i - 1] + fib[i - 2]);
        }
        let squares = fib.iter().map(|v| v.square()).collect();

        let output = config.claimed_output.map(M31::new).unwrap_or(fib[n - 1]);
        let public_inputs = PublicInputs::new(vec![fib[0], fib[1]], vec![output]);

        Ok(Self {
            config,
            trace: Trace::new(vec![TraceColumn::new(0, fib), TraceColumn::new(1, squares)]),
            public_inputs,
        })
    }

    pub fn config(&self) -> &SimpleCircuitConfig {
        &self.config
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn public_inputs(&self) -> &PublicInputs {
        &self.public_inputs
    }

    /// Computed last Fibonacci value
    pub fn output(&self) -> M31 {
        self.trace
            .columns
            .first()
            .and_then(|column| column.values.last())
            .copied()
            .unwrap_or(M31::ZERO)
    }

    /// Wipe the witness
    pub fn clear(&mut self) {
        self.trace.clear();
    }
}

/// A built session: builder and composer, owned exclusively
#[derive(Debug)]
pub struct SimpleSession {
    builder: Box<SimpleCircuitBuilder>,
    composer: Box<Composer>,
    _ticket: SessionTicket,
}

impl SimpleSession {
    pub fn builder(&self) -> &SimpleCircuitBuilder {
        &self.builder
    }

    pub fn public_inputs(&self) -> &PublicInputs {
        self.builder.public_inputs()
    }

    pub fn verification_key(&self) -> &VerificationKey {
        self.composer.verification_key()
    }

    pub fn circuit_sizes(&self) -> CircuitSizes {
        self.composer.circuit_sizes()
    }

    pub fn create_proof(&mut self) -> Result<ProofArtifact, CircuitError> {
        let proof = self
            .composer
            .create_proof(&SimpleAir, self.builder.trace(), self.builder.public_inputs())?;
        Ok(proof)
    }

    pub fn verify_proof(&self, proof: &[u8]) -> Result<bool, CircuitError> {
        Ok(self
            .composer
            .verify_proof(&SimpleAir, proof, self.builder.public_inputs())?)
    }

    pub fn check_proof(&self, proof: &[u8]) -> Result<Verdict, CircuitError> {
        Ok(self
            .composer
            .check_proof(&SimpleAir, proof, self.builder.public_inputs())?)
    }

    /// Wipe the witness and drop both handles
    pub fn release(mut self) {
        self.builder.clear();
        debug!(proofs = self.composer.proofs_created(), "session released");
    }
}

/// The simple circuit as a [`ProofSystem`]
#[derive(Clone, Debug, Default)]
pub struct SimpleCircuit {
    config: SimpleCircuitConfig,
    prover_config: ProverConfig,
    sessions: SessionTracker,
}

impl SimpleCircuit {
    pub fn new(config: SimpleCircuitConfig, prover_config: ProverConfig) -> Self {
        Self {
            config,
            prover_config,
            sessions: SessionTracker::new(),
        }
    }

    /// Account sessions on a shared tracker instead of a private one
    pub fn with_tracker(mut self, sessions: SessionTracker) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn config(&self) -> &SimpleCircuitConfig {
        &self.config
    }

    pub fn prover_config(&self) -> &ProverConfig {
        &self.prover_config
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Build a session against `provider`, all or nothing
    #[instrument(skip_all, fields(log_rows = self.config.log_rows))]
    pub fn build_session(
        &self,
        provider: &dyn ReferenceStringProvider,
    ) -> Result<SimpleSession, CircuitError> {
        let builder = Box::new(SimpleCircuitBuilder::new(self.config.clone())?);
        let srs = provider.reference_string(builder.trace().num_rows)?;
        let composer = Box::new(Composer::new(
            &SimpleAir,
            self.config.log_rows,
            builder.public_inputs(),
            srs,
            &self.prover_config,
        )?);
        debug!(provider = %provider.describe(), "session built");

        Ok(SimpleSession {
            builder,
            composer,
            _ticket: self.sessions.open(),
        })
    }
}

impl ProofSystem for SimpleCircuit {
    type Session = SimpleSession;
    type Error = CircuitError;

    fn build(&self, provider: &dyn ReferenceStringProvider) -> Result<SimpleSession, CircuitError> {
        self.build_session(provider)
    }

    fn synthesize(&self, session: &mut SimpleSession) -> Result<ProofArtifact, CircuitError> {
        session.create_proof()
    }

    fn verify(
        &self,
        session: &mut SimpleSession,
        proof: &ProofArtifact,
    ) -> Result<bool, CircuitError> {
        session.verify_proof(proof.as_bytes())
    }

    fn release(&self, session: SimpleSession) -> Result<(), CircuitError> {
        session.release();
        Ok(())
    }
}
