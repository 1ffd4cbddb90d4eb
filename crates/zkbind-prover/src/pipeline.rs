//! Proving pipeline and boundary outcome
//!
//! [`run_pipeline`] drives a [`ProofSystem`] through build, synthesize, verify
//! and release in that order, inside one fault-capturing scope. Whatever
//! happens, the caller gets a [`BoundaryOutcome`]: either a validity flag or a
//! diagnostic, never both and never a panic.
//!
//! The session lives outside the capturing scope. A panic in any stage
//! finishes unwinding before the session is released, and release runs in a
//! scope of its own so a teardown fault cannot replace the earlier outcome.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::srs::ReferenceStringProvider;
use crate::types::ProofArtifact;

/// A proof system whose sessions can be driven by [`run_pipeline`]
pub trait ProofSystem {
    /// Builder and composer for one proving run, released exactly once
    type Session;
    /// Failure of any stage
    type Error: fmt::Display;

    /// Construct a session, all or nothing
    fn build(&self, provider: &dyn ReferenceStringProvider) -> Result<Self::Session, Self::Error>;

    /// Run the prover over the session's witness
    fn synthesize(&self, session: &mut Self::Session) -> Result<ProofArtifact, Self::Error>;

    /// Check a proof; `Ok(false)` for a well-formed but invalid artifact
    fn verify(
        &self,
        session: &mut Self::Session,
        proof: &ProofArtifact,
    ) -> Result<bool, Self::Error>;

    /// Release everything the session holds
    fn release(&self, session: Self::Session) -> Result<(), Self::Error>;
}

/// Pipeline position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Building,
    Synthesizing,
    Verifying,
    Releasing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Synthesizing => "synthesizing",
            Self::Verifying => "verifying",
            Self::Releasing => "releasing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A fault that ended the pipeline, classified by the stage it occurred in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("proof construction failed: {0}")]
    Proving(String),
    #[error("verification failed: {0}")]
    Verification(String),
}

impl PipelineError {
    /// Classify a fault raised while in `stage`
    pub fn at(stage: Stage, message: impl Into<String>) -> Self {
        match stage {
            Stage::Synthesizing => Self::Proving(message.into()),
            Stage::Verifying => Self::Verification(message.into()),
            _ => Self::Setup(message.into()),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Setup(_) => Stage::Building,
            Self::Proving(_) => Stage::Synthesizing,
            Self::Verification(_) => Stage::Verifying,
        }
    }

    /// The underlying fault message, without the stage prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Setup(m) | Self::Proving(m) | Self::Verification(m) => m,
        }
    }
}

/// A fault raised while releasing a session; logged, never reported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("teardown failed: {0}")]
pub struct TeardownFault(pub String);

/// What crosses the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryOutcome {
    /// Verification ran to completion
    Verified(bool),
    /// The pipeline failed; validity is unspecified
    Failed(PipelineError),
}

impl BoundaryOutcome {
    /// Validity flag, defined only when verification ran
    pub fn validity(&self) -> Option<bool> {
        match self {
            Self::Verified(valid) => Some(*valid),
            Self::Failed(_) => None,
        }
    }

    /// Diagnostic message, present only on failure
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Verified(_) => None,
            Self::Failed(err) => Some(err.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Render a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run build, synthesize, verify and release, capturing every fault
pub fn run_pipeline<S: ProofSystem + ?Sized>(
    system: &S,
    provider: &dyn ReferenceStringProvider,
) -> BoundaryOutcome {
    let span = info_span!("pipeline");
    let _guard = span.enter();

    let mut session: Option<S::Session> = None;
    let mut stage = Stage::Idle;

    let result = catch_unwind(AssertUnwindSafe(|| {
        drive(system, provider, &mut session, &mut stage)
    }));

    let outcome = match result {
        Ok(Ok(valid)) => BoundaryOutcome::Verified(valid),
        Ok(Err(err)) => BoundaryOutcome::Failed(err),
        Err(payload) => {
            let message = format!("panic: {}", panic_message(payload.as_ref()));
            BoundaryOutcome::Failed(PipelineError::at(stage, message))
        }
    };

    if let Some(session) = session.take() {
        stage = Stage::Releasing;
        debug!(%stage, "releasing session");
        if let Err(fault) = release(system, session) {
            warn!(error = %fault, "suppressed session teardown fault");
        }
    }
    stage = Stage::Done;

    match &outcome {
        BoundaryOutcome::Verified(valid) => info!(%stage, valid, "pipeline finished"),
        BoundaryOutcome::Failed(err) => info!(%stage, error = %err, "pipeline failed"),
    }
    outcome
}

fn drive<S: ProofSystem + ?Sized>(
    system: &S,
    provider: &dyn ReferenceStringProvider,
    slot: &mut Option<S::Session>,
    stage: &mut Stage,
) -> Result<bool, PipelineError> {
    *stage = Stage::Building;
    debug!("building session");
    let built = system
        .build(provider)
        .map_err(|e| PipelineError::Setup(e.to_string()))?;
    let session = slot.insert(built);

    *stage = Stage::Synthesizing;
    debug!("creating proof");
    let proof = system
        .synthesize(session)
        .map_err(|e| PipelineError::Proving(e.to_string()))?;

    *stage = Stage::Verifying;
    debug!(proof_len = proof.len(), "verifying proof");
    system
        .verify(session, &proof)
        .map_err(|e| PipelineError::Verification(e.to_string()))
}

/// Release a session, turning errors and panics into a [`TeardownFault`]
pub fn release<S: ProofSystem + ?Sized>(
    system: &S,
    session: S::Session,
) -> Result<(), TeardownFault> {
    match catch_unwind(AssertUnwindSafe(|| system.release(session))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(TeardownFault(err.to_string())),
        Err(payload) => Err(TeardownFault(format!("panic: {}", panic_message(payload.as_ref())))),
    }
}
