//! Diagnostic storage and the fault-capturing wrapper for entry points
//!
//! A diagnostic pointer handed to C points into a per-thread slot. It stays
//! valid until the next entry point on the same thread reports a diagnostic,
//! or until the thread exits. Callers never free it.

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use zkbind_prover::pipeline::panic_message;

thread_local! {
    static LAST_DIAGNOSTIC: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Returned when the thread's slot is already torn down
static UNAVAILABLE: &CStr = c"zkbind: diagnostic storage unavailable on this thread";

/// Store `message` in this thread's slot and return a pointer to it
///
/// Interior NUL bytes are replaced so the message is never truncated to empty.
pub(crate) fn report(message: &str) -> *const c_char {
    let bytes: Vec<u8> = message.bytes().map(|b| if b == 0 { b'?' } else { b }).collect();
    let Ok(message) = CString::new(bytes) else {
        return UNAVAILABLE.as_ptr();
    };

    LAST_DIAGNOSTIC
        .try_with(|slot| {
            let mut slot = slot.borrow_mut();
            slot.insert(message).as_ptr()
        })
        .unwrap_or_else(|_| UNAVAILABLE.as_ptr())
}

/// The most recent diagnostic on this thread, or null
pub(crate) fn last() -> *const c_char {
    LAST_DIAGNOSTIC
        .try_with(|slot| slot.borrow().as_ref().map_or(ptr::null(), |m| m.as_ptr()))
        .unwrap_or(ptr::null())
}

/// Run an entry point body, turning errors and panics into a diagnostic
///
/// Returns null on success.
pub(crate) fn guarded(entry: &str, body: impl FnOnce() -> Result<(), String>) -> *const c_char {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => ptr::null(),
        Ok(Err(message)) => report(&message),
        Err(payload) => report(&format!("{}: panic: {}", entry, panic_message(payload.as_ref()))),
    }
}
