//! zkbind circuits
//!
//! The example circuit driven through the C boundary, its session type and
//! its [`ProofSystem`](zkbind_prover::pipeline::ProofSystem) implementation.

pub mod session;
pub mod simple;

// Re-exports for convenience
pub use session::{SessionTicket, SessionTracker};
pub use simple::{
    circuit_sizes, verify_with_key, CircuitError, SimpleAir, SimpleCircuit, SimpleCircuitBuilder,
    SimpleCircuitConfig, SimpleSession, SIMPLE_CIRCUIT_ID,
};
pub use zkbind_prover::pipeline::{run_pipeline, BoundaryOutcome, PipelineError};
