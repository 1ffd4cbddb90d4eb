//! zkbind Prover - proof lifecycle behind an exception-free boundary
//!
//! This crate provides the proving pipeline used by the zkbind C bindings:
//! reference strings, keys, a Merkle-committed spot-check prover over M31, and
//! the adapter that runs a proof system end to end while capturing faults.
//!
//! # Features
//!
//! - `serde` - Serialize/deserialize configuration types
//!
//! # Components
//!
//! - `m31` - Mersenne-31 field implementation
//! - `merkle` - Keccak256-based Merkle commitments
//! - `air` - Algebraic Intermediate Representation constraints
//! - `transcript` - Fiat-Shamir transcript
//! - `srs` - Reference strings and their providers
//! - `keys` - Proving and verification keys
//! - `prover` - Proof generation
//! - `verifier` - Proof verification
//! - `composer` - Per-session proving context
//! - `pipeline` - Build/synthesize/verify/release driver and boundary outcome
//! - `types` - Common types (Proof, PublicInputs, etc.)

pub mod air;
pub mod composer;
pub mod keys;
pub mod m31;
pub mod merkle;
pub mod pipeline;
pub mod prover;
pub mod srs;
pub mod transcript;
pub mod types;
pub mod verifier;

// Re-exports for convenience
pub use air::{
    BoundaryAssertion, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn,
};
pub use composer::Composer;
pub use keys::{CircuitSizes, KeyError, ProvingKey, VerificationKey};
pub use m31::{M31, M31_PRIME};
pub use merkle::{Hash, MerkleCommitment, MerklePath};
pub use pipeline::{run_pipeline, BoundaryOutcome, PipelineError, ProofSystem, Stage, TeardownFault};
pub use prover::{Prover, ProverConfig};
pub use srs::{
    get_crs_factory, init_crs_factory, init_file_crs_factory, init_seeded_crs_factory,
    FileReferenceStringFactory, MemReferenceStringFactory, ReferenceString, ReferenceStringProvider,
    SeededReferenceStringFactory, SrsError,
};
pub use types::{Proof, ProofArtifact, ProofError, ProofFormatError, ProofLayout, PublicInputs};
pub use verifier::{Rejection, Verdict, VerificationError, Verifier};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::air::{ConstraintEvaluator, Trace};
    pub use crate::composer::Composer;
    pub use crate::m31::{M31, M31_PRIME};
    pub use crate::pipeline::{run_pipeline, BoundaryOutcome, ProofSystem};
    pub use crate::srs::{get_crs_factory, ReferenceStringProvider};
    pub use crate::types::{ProofArtifact, PublicInputs};
}
