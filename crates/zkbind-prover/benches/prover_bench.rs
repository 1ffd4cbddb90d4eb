//! Benchmarks for proof generation and verification

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zkbind_prover::air::{
    BoundaryAssertion, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn,
};
use zkbind_prover::composer::Composer;
use zkbind_prover::m31::M31;
use zkbind_prover::prover::ProverConfig;
use zkbind_prover::srs::ReferenceString;
use zkbind_prover::types::{ProofError, PublicInputs};

/// c[i+1] = c[i] + 1
struct CounterAir;

impl ConstraintEvaluator for CounterAir {
    fn circuit_id(&self) -> &str {
        "bench-counter"
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

fn setup(log_rows: u32) -> (Composer, Trace, PublicInputs) {
    let srs = Arc::new(ReferenceString::generate(1 << 16, b"bench").unwrap());
    let public_inputs = PublicInputs::empty();
    let config = ProverConfig::default();
    let composer = Composer::new(&CounterAir, log_rows, &public_inputs, srs, &config).unwrap();
    let values = (0..1u32 << log_rows).map(M31::new).collect();
    (composer, Trace::new(vec![TraceColumn::new(0, values)]), public_inputs)
}

fn bench_prove(c: &mut Criterion) {
    let mut group = c.benchmark_group("prove");

    for log_rows in [8u32, 12, 16] {
        let (mut composer, trace, public_inputs) = setup(log_rows);
        group.bench_with_input(BenchmarkId::new("log_rows", log_rows), &trace, |b, trace| {
            b.iter(|| composer.create_proof(&CounterAir, black_box(trace), &public_inputs))
        });
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let (mut composer, trace, public_inputs) = setup(12);
    let proof = composer.create_proof(&CounterAir, &trace, &public_inputs).unwrap();

    c.bench_function("verify_log_rows_12", |bench| {
        bench.iter(|| {
            composer.verify_proof(&CounterAir, black_box(proof.as_bytes()), &public_inputs)
        })
    });
}

criterion_group!(benches, bench_prove, bench_verify);
criterion_main!(benches);
