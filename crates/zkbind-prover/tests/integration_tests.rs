//! Integration tests for the complete prover system

mod common;

use common::{composer, fib_trace, test_srs, FibAir};
use zkbind_prover::air::{verify_constraints, Trace, TraceColumn};
use zkbind_prover::keys::VerificationKey;
use zkbind_prover::prelude::*;
use zkbind_prover::prover::ProverConfig;
use zkbind_prover::types::{ProofError, ProofFormatError};
use zkbind_prover::verifier::{Rejection, Verdict, VerificationError};

#[test]
fn test_fibonacci_constraints_pass() {
    let (trace, _) = fib_trace(5, M31::ONE, M31::ONE);
    assert!(verify_constraints(&FibAir, &trace).is_ok());
}

#[test]
fn test_fibonacci_proof_verification() {
    let (trace, public_inputs) = fib_trace(6, M31::ONE, M31::ONE);
    let mut composer = composer(6, &ProverConfig::fast(), &public_inputs);

    let proof = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();
    assert_eq!(proof.len(), composer.verification_key().layout().proof_size());
    assert_eq!(composer.proofs_created(), 1);

    assert!(composer.verify_proof(&FibAir, proof.as_bytes(), &public_inputs).unwrap());
}

#[test]
fn test_proofs_are_deterministic() {
    let (trace, public_inputs) = fib_trace(5, M31::new(3), M31::new(4));
    let mut composer = composer(5, &ProverConfig::default(), &public_inputs);

    let first = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();
    let second = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_wrong_claimed_output_fails_proving() {
    let (trace, mut public_inputs) = fib_trace(4, M31::ONE, M31::ONE);
    public_inputs.final_state[0] += M31::ONE;
    let mut composer = composer(4, &ProverConfig::fast(), &public_inputs);

    let err = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap_err();
    assert!(matches!(err, ProofError::ConstraintViolation(_)));
}

#[test]
fn test_invalid_trace_fails_proving() {
    // Boundary rows stay intact, only the transition breaks
    let (mut trace, public_inputs) = fib_trace(4, M31::ZERO, M31::ONE);
    trace.columns[0].values[7] += M31::ONE;
    let mut composer = composer(4, &ProverConfig::fast(), &public_inputs);

    let err = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap_err();
    assert!(matches!(err, ProofError::ConstraintViolation(_)));
    assert!(err.to_string().contains("fibonacci failed at row 5"), "{}", err);
}

#[test]
fn test_arbitrary_trace_fails_boundary_first() {
    let (_, public_inputs) = fib_trace(4, M31::ZERO, M31::ONE);
    let values: Vec<M31> = (0..16).map(M31::new).collect();
    let trace = Trace::new(vec![TraceColumn::new(0, values)]);
    let mut composer = composer(4, &ProverConfig::fast(), &public_inputs);

    let err = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap_err();
    assert!(err.to_string().contains("boundary assertion at row 15"), "{}", err);
}

#[test]
fn test_trace_shape_mismatch() {
    let (trace, public_inputs) = fib_trace(5, M31::ONE, M31::ONE);
    let mut composer = composer(4, &ProverConfig::fast(), &public_inputs);

    let err = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap_err();
    assert!(matches!(err, ProofError::InvalidParameters(_)));
}

#[test]
fn test_other_public_inputs_rejected() {
    let (trace, public_inputs) = fib_trace(5, M31::ONE, M31::ONE);
    let mut composer = composer(5, &ProverConfig::fast(), &public_inputs);
    let proof = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();

    let mut claimed = public_inputs.clone();
    claimed.final_state[0] += M31::ONE;
    let verdict = composer.check_proof(&FibAir, proof.as_bytes(), &claimed).unwrap();
    assert_eq!(verdict, Verdict::Rejected(Rejection::BoundaryValue { index: 2 }));
}

#[test]
fn test_length_mismatch_is_an_error() {
    let (trace, public_inputs) = fib_trace(4, M31::ONE, M31::ONE);
    let mut composer = composer(4, &ProverConfig::fast(), &public_inputs);
    let proof = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();

    let mut bytes = proof.into_bytes();
    bytes.pop();
    let err = composer.verify_proof(&FibAir, &bytes, &public_inputs).unwrap_err();
    assert!(matches!(
        err,
        VerificationError::Format(ProofFormatError::SizeMismatch { .. })
    ));

    assert!(composer.verify_proof(&FibAir, &[], &public_inputs).is_err());
}

#[test]
fn test_queries_capped_by_domain() {
    let (trace, public_inputs) = fib_trace(2, M31::ONE, M31::ONE);
    let mut composer = composer(2, &ProverConfig::high_security(), &public_inputs);
    // 4 rows, window 3: two transition rows
    assert_eq!(composer.verification_key().num_queries(), 2);

    let proof = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();
    assert!(composer.verify_proof(&FibAir, proof.as_bytes(), &public_inputs).unwrap());
}

#[test]
fn test_serialized_key_verifies() {
    let (trace, public_inputs) = fib_trace(5, M31::ONE, M31::ONE);
    let mut composer = composer(5, &ProverConfig::fast(), &public_inputs);
    let proof = composer.create_proof(&FibAir, &trace, &public_inputs).unwrap();

    let vk_bytes = composer.verification_key().to_bytes();
    let vk = VerificationKey::from_bytes(&vk_bytes, &test_srs()).unwrap();
    let verdict = zkbind_prover::Verifier::new()
        .check(&vk, &FibAir, proof.as_bytes(), &public_inputs)
        .unwrap();
    assert_eq!(verdict, Verdict::Accepted);
}

#[test]
fn test_circuit_sizes() {
    let (_, public_inputs) = fib_trace(6, M31::ONE, M31::ONE);
    let sizes = composer(6, &ProverConfig::fast(), &public_inputs).circuit_sizes();
    assert_eq!(sizes.subgroup, 64);
    assert_eq!(sizes.exact, 62);
    assert_eq!(sizes.total, 64);
}
