//! Reference string configuration

use std::ffi::{c_char, CStr};
use std::slice;

use zkbind_prover::srs::{init_file_crs_factory, init_seeded_crs_factory};

use crate::diagnostic::guarded;

/// Replace the process-wide reference string with `num_points` points derived from `seed`.
///
/// `seed` may be `NULL` when `seed_len` is zero.
#[no_mangle]
pub extern "C" fn zkbind_srs_init_generated(
    num_points: u32,
    seed: *const u8,
    seed_len: usize,
) -> *const c_char {
    guarded("zkbind_srs_init_generated", || {
        let seed: &[u8] = if seed_len == 0 {
            &[]
        } else if seed.is_null() {
            return Err("null seed with non-zero length".to_string());
        } else {
            // SAFETY: caller promised `seed` points to `seed_len` readable bytes.
            unsafe { slice::from_raw_parts(seed, seed_len) }
        };
        init_seeded_crs_factory(num_points as usize, seed).map_err(|e| e.to_string())
    })
}

/// Replace the process-wide reference string with the one stored at `path`.
///
/// The file is read immediately; on failure the previous provider stays in place.
#[no_mangle]
pub extern "C" fn zkbind_srs_init_from_file(path: *const c_char) -> *const c_char {
    guarded("zkbind_srs_init_from_file", || {
        if path.is_null() {
            return Err("null path passed to zkbind_srs_init_from_file".to_string());
        }
        // SAFETY: caller promised a NUL-terminated string.
        let path = unsafe { CStr::from_ptr(path) }
            .to_str()
            .map_err(|e| format!("path is not valid UTF-8: {}", e))?;
        init_file_crs_factory(path).map_err(|e| e.to_string())
    })
}
