//! Composer handles
//!
//! A handle owns one simple-circuit session. Create it with
//! [`zkbind_composer_new`], release it exactly once with
//! [`zkbind_composer_delete`]. A handle must not be used from two threads at
//! the same time.

use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use tracing::warn;
use zkbind::{circuit_sizes, SimpleCircuit, SimpleCircuitConfig, SimpleSession};
use zkbind_prover::pipeline::panic_message;
use zkbind_prover::srs::get_crs_factory;
use zkbind_prover::ProverConfig;

use crate::buffer::{read_slice, write_allocated_bytes, write_null};
use crate::diagnostic::guarded;
use crate::SESSIONS;

/// Opaque session handle
pub struct ComposerHandle {
    session: SimpleSession,
}

fn handle<'a>(
    composer: *mut ComposerHandle,
    entry: &str,
) -> Result<&'a mut ComposerHandle, String> {
    if composer.is_null() {
        return Err(format!("null composer passed to {}", entry));
    }
    // SAFETY: non-null handles come from `zkbind_composer_new` and are not yet deleted.
    Ok(unsafe { &mut *composer })
}

/// Build a session for the simple circuit with `2^log_rows` rows.
///
/// On success `*out` receives the handle; on failure it is set to `NULL`.
#[no_mangle]
pub extern "C" fn zkbind_composer_new(
    log_rows: u32,
    out: *mut *mut ComposerHandle,
) -> *const c_char {
    guarded("zkbind_composer_new", || {
        if out.is_null() {
            return Err("null output pointer passed to zkbind_composer_new".to_string());
        }
        // SAFETY: checked non-null; caller promised it is writable.
        unsafe { *out = ptr::null_mut() };

        let config = SimpleCircuitConfig::with_log_rows(log_rows);
        let circuit = SimpleCircuit::new(config, ProverConfig::default())
            .with_tracker(SESSIONS.clone());
        let session = circuit
            .build_session(get_crs_factory().as_ref())
            .map_err(|e| format!("setup failed: {}", e))?;

        let raw = Box::into_raw(Box::new(ComposerHandle { session }));
        // SAFETY: as above.
        unsafe { *out = raw };
        Ok(())
    })
}

/// Create a proof. The buffer must be released with `zkbind_free_bytes`.
#[no_mangle]
pub extern "C" fn zkbind_composer_create_proof(
    composer: *mut ComposerHandle,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> *const c_char {
    guarded("zkbind_composer_create_proof", || {
        write_null(out_ptr, out_len);
        let handle = handle(composer, "zkbind_composer_create_proof")?;
        let proof = handle
            .session
            .create_proof()
            .map_err(|e| format!("proof construction failed: {}", e))?;
        write_allocated_bytes(out_ptr, out_len, proof.into_bytes())
    })
}

/// Verify `len` proof bytes.
///
/// `*valid` is set to `false` on entry and holds the verification result
/// only when `NULL` is returned.
#[no_mangle]
pub extern "C" fn zkbind_composer_verify_proof(
    composer: *mut ComposerHandle,
    proof: *const u8,
    len: usize,
    valid: *mut bool,
) -> *const c_char {
    guarded("zkbind_composer_verify_proof", || {
        if valid.is_null() {
            return Err("null `valid` pointer passed to zkbind_composer_verify_proof".to_string());
        }
        // SAFETY: checked non-null; caller promised it is writable.
        unsafe { *valid = false };

        let handle = handle(composer, "zkbind_composer_verify_proof")?;
        let bytes = read_slice(proof, len, "proof")?;

        let result = handle
            .session
            .verify_proof(bytes)
            .map_err(|e| format!("verification failed: {}", e))?;
        // SAFETY: as above.
        unsafe { *valid = result };
        Ok(())
    })
}

/// Serialized verification key. The buffer must be released with `zkbind_free_bytes`.
#[no_mangle]
pub extern "C" fn zkbind_composer_get_verification_key(
    composer: *mut ComposerHandle,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> *const c_char {
    guarded("zkbind_composer_get_verification_key", || {
        write_null(out_ptr, out_len);
        let handle = handle(composer, "zkbind_composer_get_verification_key")?;
        write_allocated_bytes(out_ptr, out_len, handle.session.verification_key().to_bytes())
    })
}

/// Sizes of the simple circuit at `log_rows`, without building it.
#[no_mangle]
pub extern "C" fn zkbind_get_circuit_sizes(
    log_rows: u32,
    exact: *mut u32,
    total: *mut u32,
    subgroup: *mut u32,
) -> *const c_char {
    guarded("zkbind_get_circuit_sizes", || {
        if exact.is_null() || total.is_null() || subgroup.is_null() {
            return Err("null output pointer passed to zkbind_get_circuit_sizes".to_string());
        }
        let sizes = circuit_sizes(log_rows).map_err(|e| e.to_string())?;
        // SAFETY: checked non-null; caller promised they are writable.
        unsafe {
            *exact = sizes.exact;
            *total = sizes.total;
            *subgroup = sizes.subgroup;
        }
        Ok(())
    })
}

/// Release a handle. `NULL` is a no-op; deleting twice is undefined.
#[no_mangle]
pub extern "C" fn zkbind_composer_delete(composer: *mut ComposerHandle) {
    if composer.is_null() {
        return;
    }
    // SAFETY: the handle came from `zkbind_composer_new` and is released only here.
    let handle = unsafe { Box::from_raw(composer) };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || handle.session.release())) {
        warn!(panic = %panic_message(payload.as_ref()), "suppressed composer teardown fault");
    }
}
