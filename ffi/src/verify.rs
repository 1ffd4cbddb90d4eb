//! Verification without a composer handle

use std::ffi::c_char;

use zkbind::verify_with_key;
use zkbind_prover::srs::get_crs_factory;
use zkbind_prover::{PublicInputs, M31, M31_PRIME};

use crate::buffer::read_slice;
use crate::diagnostic::guarded;

fn field_elements(values: &[u32], what: &str) -> Result<Vec<M31>, String> {
    values
        .iter()
        .map(|&v| {
            if v < M31_PRIME {
                Ok(M31::new(v))
            } else {
                Err(format!("{} value {} is not a canonical field element", what, v))
            }
        })
        .collect()
}

/// Verify a proof against serialized verification key bytes.
///
/// The key must come from `zkbind_composer_get_verification_key` under the
/// current reference string; the composer itself may already be deleted.
/// `initial` and `final_state` are the public inputs the proof was made for.
/// `*valid` is set to `false` on entry and holds the verification result
/// only when `NULL` is returned.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn zkbind_verify_with_key(
    vk: *const u8,
    vk_len: usize,
    proof: *const u8,
    proof_len: usize,
    initial: *const u32,
    initial_len: usize,
    final_state: *const u32,
    final_len: usize,
    valid: *mut bool,
) -> *const c_char {
    guarded("zkbind_verify_with_key", || {
        if valid.is_null() {
            return Err("null `valid` pointer passed to zkbind_verify_with_key".to_string());
        }
        // SAFETY: checked non-null; caller promised it is writable.
        unsafe { *valid = false };

        let vk = read_slice(vk, vk_len, "verification key")?;
        let proof = read_slice(proof, proof_len, "proof")?;
        let public_inputs = PublicInputs::new(
            field_elements(read_slice(initial, initial_len, "initial state")?, "initial state")?,
            field_elements(read_slice(final_state, final_len, "final state")?, "final state")?,
        );

        let result = verify_with_key(get_crs_factory().as_ref(), vk, proof, &public_inputs)
            .map_err(|e| format!("verification failed: {}", e))?;
        // SAFETY: as above.
        unsafe { *valid = result };
        Ok(())
    })
}
