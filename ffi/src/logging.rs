//! Opt-in log output for hosts

use std::ffi::{c_char, CStr};

use tracing_subscriber::EnvFilter;

use crate::diagnostic::guarded;

/// Install a stderr `tracing` subscriber filtered by `filter` (`NULL` means `info`).
///
/// Fails if the filter does not parse or a global subscriber already exists.
#[no_mangle]
pub extern "C" fn zkbind_enable_logging(filter: *const c_char) -> *const c_char {
    guarded("zkbind_enable_logging", || {
        let directives = if filter.is_null() {
            "info".to_string()
        } else {
            // SAFETY: caller promised a NUL-terminated string.
            unsafe { CStr::from_ptr(filter) }.to_string_lossy().into_owned()
        };
        let filter = EnvFilter::try_new(&directives)
            .map_err(|e| format!("invalid log filter {:?}: {}", directives, e))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| format!("cannot install logger: {}", e))
    })
}
