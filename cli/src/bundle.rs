//! Proof bundle written by `zkbind prove`

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use zkbind::SimpleCircuitConfig;
use zkbind_prover::{PublicInputs, M31};

/// Everything needed to verify a proof offline, given the reference string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofBundle {
    pub circuit: SimpleCircuitConfig,
    pub initial_state: Vec<u32>,
    pub final_state: Vec<u32>,
    /// Hex-encoded verification key
    pub verification_key: String,
    /// Hex-encoded proof
    pub proof: String,
}

impl ProofBundle {
    pub fn new(
        circuit: SimpleCircuitConfig,
        public_inputs: &PublicInputs,
        vk: &[u8],
        proof: &[u8],
    ) -> Self {
        Self {
            circuit,
            initial_state: public_inputs.initial_state.iter().map(|v| v.value()).collect(),
            final_state: public_inputs.final_state.iter().map(|v| v.value()).collect(),
            verification_key: hex::encode(vk),
            proof: hex::encode(proof),
        }
    }

    pub fn public_inputs(&self) -> Result<PublicInputs> {
        let decode = |values: &[u32]| -> Result<Vec<M31>> {
            values
                .iter()
                .map(|&v| {
                    ensure!(
                        v < zkbind_prover::M31_PRIME,
                        "public input {} is not a field element",
                        v
                    );
                    Ok(M31::new(v))
                })
                .collect()
        };
        Ok(PublicInputs::new(decode(&self.initial_state)?, decode(&self.final_state)?))
    }

    pub fn verification_key_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.verification_key).context("verification key is not hex")
    }

    pub fn proof_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.proof).context("proof is not hex")
    }
}
