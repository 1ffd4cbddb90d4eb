//! C ABI for zkbind
//!
//! Every entry point is exception-free: errors and panics are captured and
//! reported as a NUL-terminated diagnostic, `NULL` meaning success. See
//! `include/zkbind.h` for the C declarations.
//!
//! Diagnostics live in thread-local storage owned by this library and stay
//! valid until the next diagnostic-reporting call on the same thread. Byte
//! buffers are allocated here and released with [`zkbind_free_bytes`].

use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::Lazy;
use zkbind::{run_pipeline, BoundaryOutcome, PipelineError, SessionTracker, SimpleCircuit};
use zkbind_prover::pipeline::panic_message;
use zkbind_prover::srs::get_crs_factory;

mod buffer;
mod composer;
mod diagnostic;
mod logging;
mod srs;
mod verify;

pub use buffer::zkbind_free_bytes;
pub use composer::{
    zkbind_composer_create_proof, zkbind_composer_delete, zkbind_composer_get_verification_key,
    zkbind_composer_new, zkbind_composer_verify_proof, zkbind_get_circuit_sizes, ComposerHandle,
};
pub use logging::zkbind_enable_logging;
pub use srs::{zkbind_srs_init_from_file, zkbind_srs_init_generated};
pub use verify::zkbind_verify_with_key;

/// Sessions opened through this library, pipeline runs and composer handles alike
pub(crate) static SESSIONS: Lazy<SessionTracker> = Lazy::new(SessionTracker::new);

/// Build, prove, verify and release the simple circuit in one call.
///
/// Returns `NULL` on success with `*valid` set to the verification result.
/// On failure returns a diagnostic and sets `*valid` to `false`; the flag
/// must then be ignored. A `NULL` `valid` pointer is itself a failure.
#[no_mangle]
pub extern "C" fn zkbind_simple_create_and_verify_proof(valid: *mut bool) -> *const c_char {
    if valid.is_null() {
        return diagnostic::report(
            "null `valid` pointer passed to zkbind_simple_create_and_verify_proof",
        );
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let provider = get_crs_factory();
        let circuit = SimpleCircuit::default().with_tracker(SESSIONS.clone());
        run_pipeline(&circuit, provider.as_ref())
    }))
    .unwrap_or_else(|payload| {
        BoundaryOutcome::Failed(PipelineError::Setup(format!(
            "panic: {}",
            panic_message(payload.as_ref())
        )))
    });

    match outcome {
        BoundaryOutcome::Verified(result) => {
            // SAFETY: checked non-null above; caller promised it is writable.
            unsafe { *valid = result };
            std::ptr::null()
        }
        BoundaryOutcome::Failed(err) => {
            // SAFETY: as above.
            unsafe { *valid = false };
            diagnostic::report(&err.to_string())
        }
    }
}

/// The most recent diagnostic reported on the calling thread, or `NULL`.
#[no_mangle]
pub extern "C" fn zkbind_last_diagnostic() -> *const c_char {
    diagnostic::last()
}

/// Sessions built through this library and not yet released.
#[no_mangle]
pub extern "C" fn zkbind_live_sessions() -> usize {
    SESSIONS.live()
}
