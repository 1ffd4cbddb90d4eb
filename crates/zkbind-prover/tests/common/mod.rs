//! Shared fixtures for the prover integration tests

#![allow(dead_code)]

use std::sync::Arc;

use zkbind_prover::air::{
    BoundaryAssertion, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn,
};
use zkbind_prover::composer::Composer;
use zkbind_prover::m31::M31;
use zkbind_prover::prover::ProverConfig;
use zkbind_prover::srs::ReferenceString;
use zkbind_prover::types::{ProofError, PublicInputs};

/// f[i+2] = f[i+1] + f[i], with both seeds and the last value public
pub struct FibAir;

impl ConstraintEvaluator for FibAir {
    fn circuit_id(&self) -> &str {
        "test-fibonacci"
    }

    fn num_columns(&self) -> usize {
        1
    }

    fn window(&self) -> usize {
        3
    }

    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
        vec![frame.get(2, 0) - frame.get(1, 0) - frame.get(0, 0)]
    }

    fn constraints(&self) -> Vec<Constraint> {
        vec![Constraint::new("fibonacci", 1, vec![0])]
    }

    fn boundary_assertions(
        &self,
        public_inputs: &PublicInputs,
        num_rows: usize,
    ) -> Result<Vec<BoundaryAssertion>, ProofError> {
        match (public_inputs.initial_state.as_slice(), public_inputs.final_state.as_slice()) {
            ([a, b], [last]) => Ok(vec![
                BoundaryAssertion::new(0, 0, *a),
                BoundaryAssertion::new(0, 1, *b),
                BoundaryAssertion::new(0, num_rows - 1, *last),
            ]),
            _ => Err(ProofError::invalid_witness("expected two seeds and one output")),
        }
    }
}

pub fn fib_trace(log_rows: u32, a: M31, b: M31) -> (Trace, PublicInputs) {
    let n = 1usize << log_rows;
    let mut values = vec![a, b];
    for i in 2..n {
        values.push(values[i - 1] + values[i - 2]);
    }
    let public_inputs = PublicInputs::new(vec![a, b], vec![values[n - 1]]);
    (Trace::new(vec![TraceColumn::new(0, values)]), public_inputs)
}

pub fn test_srs() -> Arc<ReferenceString> {
    Arc::new(ReferenceString::generate(1 << 10, b"zkbind-tests").unwrap())
}

pub fn composer(log_rows: u32, config: &ProverConfig, public_inputs: &PublicInputs) -> Composer {
    Composer::new(&FibAir, log_rows, public_inputs, test_srs(), config).unwrap()
}
