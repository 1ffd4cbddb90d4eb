//! Composer: the proving and verification context of a session
//!
//! A composer is derived from a reference string and a circuit. It owns the
//! keys and turns traces into serialized proofs and back into verdicts.

use std::sync::Arc;

use tracing::debug;

use crate::air::{ConstraintEvaluator, Trace};
use crate::keys::{CircuitSizes, KeyError, ProvingKey, VerificationKey};
use crate::prover::{Prover, ProverConfig};
use crate::srs::ReferenceString;
use crate::types::{ProofArtifact, ProofError, PublicInputs};
use crate::verifier::{Verdict, VerificationError, Verifier};

#[derive(Debug)]
pub struct Composer {
    srs: Arc<ReferenceString>,
    proving_key: ProvingKey,
    proofs_created: usize,
}

impl Composer {
    /// Derive keys for `evaluator` over `2^log_rows` rows
    pub fn new<E: ConstraintEvaluator + ?Sized>(
        evaluator: &E,
        log_rows: u32,
        public_inputs: &PublicInputs,
        srs: Arc<ReferenceString>,
        config: &ProverConfig,
    ) -> Result<Self, KeyError> {
        let vk = VerificationKey::setup(evaluator, log_rows, public_inputs, config, &srs)?;
        debug!(
            circuit = vk.circuit_id(),
            log_rows,
            queries = vk.num_queries(),
            "composer initialized"
        );
        Ok(Self {
            srs,
            proving_key: ProvingKey::new(vk),
            proofs_created: 0,
        })
    }

    pub fn verification_key(&self) -> &VerificationKey {
        self.proving_key.verification_key()
    }

    pub fn reference_string(&self) -> &Arc<ReferenceString> {
        &self.srs
    }

    pub fn circuit_sizes(&self) -> CircuitSizes {
        self.verification_key().circuit_sizes()
    }

    /// Number of proofs this composer has produced
    pub fn proofs_created(&self) -> usize {
        self.proofs_created
    }

    pub fn create_proof<E: ConstraintEvaluator + ?Sized>(
        &mut self,
        evaluator: &E,
        trace: &Trace,
        public_inputs: &PublicInputs,
    ) -> Result<ProofArtifact, ProofError> {
        let proof = Prover::new().prove(&self.proving_key, evaluator, trace, public_inputs)?;
        self.proofs_created += 1;
        Ok(ProofArtifact::from(proof))
    }

    pub fn verify_proof<E: ConstraintEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        proof: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<bool, VerificationError> {
        Verifier::new().verify(self.verification_key(), evaluator, proof, public_inputs)
    }

    pub fn check_proof<E: ConstraintEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        proof: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<Verdict, VerificationError> {
        Verifier::new().check(self.verification_key(), evaluator, proof, public_inputs)
    }
}
