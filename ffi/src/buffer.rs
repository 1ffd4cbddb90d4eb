//! Library-allocated byte buffers

use std::{ptr, slice};

/// Borrow `len` caller-owned elements; `NULL` is accepted only when `len` is zero.
pub(crate) fn read_slice<'a, T>(data: *const T, len: usize, what: &str) -> Result<&'a [T], String> {
    if len == 0 {
        Ok(&[])
    } else if data.is_null() {
        Err(format!("null {} with non-zero length", what))
    } else {
        // SAFETY: caller promised `data` points to `len` readable elements.
        Ok(unsafe { slice::from_raw_parts(data, len) })
    }
}

pub(crate) fn write_null(out_ptr: *mut *mut u8, out_len: *mut usize) {
    if !out_ptr.is_null() {
        // SAFETY: caller promised `out_ptr` is valid when non-null.
        unsafe { *out_ptr = ptr::null_mut() };
    }
    if !out_len.is_null() {
        // SAFETY: caller promised `out_len` is valid when non-null.
        unsafe { *out_len = 0 };
    }
}

pub(crate) fn write_allocated_bytes(
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
    bytes: Vec<u8>,
) -> Result<(), String> {
    if out_ptr.is_null() || out_len.is_null() {
        return Err("null output buffer pointer".to_string());
    }

    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    let ptr = Box::into_raw(boxed) as *mut u8;

    // SAFETY: caller provided valid pointers for outputs.
    unsafe {
        *out_ptr = ptr;
        *out_len = len;
    }
    Ok(())
}

/// Free a buffer returned by this library
///
/// `len` must be exactly the length returned alongside `ptr`. Null is a no-op.
#[no_mangle]
pub extern "C" fn zkbind_free_bytes(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }

    // SAFETY:
    // - The buffer was allocated by Rust (via `Box<[u8]>`) and leaked with `Box::into_raw`.
    // - `len` must be exactly the original length.
    unsafe {
        let slice = ptr::slice_from_raw_parts_mut(ptr, len);
        drop(Box::from_raw(slice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_bytes_round_trip() {
        let mut out_ptr: *mut u8 = ptr::null_mut();
        let mut out_len = 0usize;

        write_allocated_bytes(&mut out_ptr, &mut out_len, vec![1, 2, 3]).unwrap();
        assert_eq!(out_len, 3);
        let bytes = unsafe { std::slice::from_raw_parts(out_ptr, out_len) }.to_vec();
        assert_eq!(bytes, vec![1, 2, 3]);

        zkbind_free_bytes(out_ptr, out_len);
        write_null(&mut out_ptr, &mut out_len);
        assert!(out_ptr.is_null());
        assert_eq!(out_len, 0);
    }

    #[test]
    fn test_read_slice() {
        let values = [7u32, 8, 9];
        assert_eq!(read_slice(values.as_ptr(), 2, "values").unwrap(), &[7, 8]);
        assert!(read_slice::<u32>(ptr::null(), 0, "values").unwrap().is_empty());
        let err = read_slice::<u8>(ptr::null(), 4, "proof").unwrap_err();
        assert_eq!(err, "null proof with non-zero length");
    }

    #[test]
    fn test_null_outputs_rejected() {
        assert!(write_allocated_bytes(ptr::null_mut(), ptr::null_mut(), vec![1]).is_err());
        zkbind_free_bytes(ptr::null_mut(), 0);
    }
}
