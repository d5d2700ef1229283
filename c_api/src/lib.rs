//! `__cxa_demangle`-compatible C entry points for `itanium-demangle`.
//!
//! The exported functions follow the libcxxabi calling convention: the
//! caller may hand in a `malloc`ed buffer and its capacity, which is grown
//! with `realloc` when too small, and the (possibly moved) buffer is handed
//! back along with a status code.

extern crate itanium_demangle;
extern crate libc;

use libc::{c_char, c_int, size_t};
use std::ffi::CStr;
use std::ptr;

/// The demangling succeeded; the returned buffer holds the declaration.
pub const DEMANGLE_SUCCESS: c_int = 0;
/// Growing the output buffer failed.
pub const DEMANGLE_MEMORY_ALLOC_FAILURE: c_int = -1;
/// The input is not a valid mangled name.
pub const DEMANGLE_INVALID_MANGLED_NAME: c_int = -2;
/// `mangled` was null, or `buf` was provided without `n`.
pub const DEMANGLE_INVALID_ARGS: c_int = -3;

unsafe fn set_status(status: *mut c_int, value: c_int) {
    if !status.is_null() {
        *status = value;
    }
}

/// Demangle the NUL-terminated `mangled` into a NUL-terminated declaration.
///
/// * `buf` is an optional `malloc`ed buffer to reuse; when provided, `n`
///   must point at its capacity. The buffer is `realloc`ed when too small,
///   so the caller must use the returned pointer, not `buf`.
/// * On success `*n` (when `n` is non-null) is set to the output length
///   including the trailing NUL, `*status` to `DEMANGLE_SUCCESS`, and the
///   output buffer is returned. The caller owns it and frees it with
///   `free` (or `itanium_demangle_free`).
/// * On failure the result is null and `*status` describes why; `buf` is
///   left untouched.
#[no_mangle]
pub unsafe extern "C" fn itanium_demangle(
    mangled: *const c_char,
    buf: *mut c_char,
    n: *mut size_t,
    status: *mut c_int,
) -> *mut c_char {
    if mangled.is_null() || (!buf.is_null() && n.is_null()) {
        set_status(status, DEMANGLE_INVALID_ARGS);
        return ptr::null_mut();
    }

    let bytes = CStr::from_ptr(mangled).to_bytes();
    let demangled = match itanium_demangle::demangle(bytes) {
        Ok(demangled) => demangled,
        Err(_) => {
            set_status(status, DEMANGLE_INVALID_MANGLED_NAME);
            return ptr::null_mut();
        }
    };

    let needed = demangled.len() + 1;
    let dst = if buf.is_null() {
        libc::malloc(needed) as *mut c_char
    } else if *n >= needed {
        buf
    } else {
        libc::realloc(buf as *mut libc::c_void, needed) as *mut c_char
    };
    if dst.is_null() {
        set_status(status, DEMANGLE_MEMORY_ALLOC_FAILURE);
        return ptr::null_mut();
    }

    ptr::copy_nonoverlapping(demangled.as_ptr() as *const c_char, dst, demangled.len());
    *dst.offset(demangled.len() as isize) = 0;
    if !n.is_null() {
        *n = needed;
    }
    set_status(status, DEMANGLE_SUCCESS);
    dst
}

/// Free a buffer returned by `itanium_demangle`. Equivalent to `free`.
#[no_mangle]
pub unsafe extern "C" fn itanium_demangle_free(buf: *mut c_char) {
    if !buf.is_null() {
        libc::free(buf as *mut libc::c_void);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    unsafe fn demangle_to_string(mangled: &CStr) -> Option<String> {
        let mut status = 42;
        let out = itanium_demangle(
            mangled.as_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            &mut status,
        );
        if out.is_null() {
            assert_ne!(status, DEMANGLE_SUCCESS);
            return None;
        }
        assert_eq!(status, DEMANGLE_SUCCESS);
        let result = CStr::from_ptr(out).to_string_lossy().into_owned();
        itanium_demangle_free(out);
        Some(result)
    }

    #[test]
    fn demangles_a_simple_symbol() {
        let mangled = CStr::from_bytes_with_nul(b"_ZN3foo3barEi\0").unwrap();
        unsafe {
            assert_eq!(
                demangle_to_string(mangled).expect("should demangle"),
                "foo::bar(int)"
            );
        }
    }

    #[test]
    fn invalid_mangled_names_report_status() {
        let mangled = CStr::from_bytes_with_nul(b"_Zxxxxxxx\0").unwrap();
        unsafe {
            assert_eq!(demangle_to_string(mangled), None);

            let mut status = 0;
            let out = itanium_demangle(
                mangled.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut status,
            );
            assert!(out.is_null());
            assert_eq!(status, DEMANGLE_INVALID_MANGLED_NAME);
        }
    }

    #[test]
    fn null_and_mismatched_arguments_are_rejected() {
        unsafe {
            let mut status = 0;
            let out = itanium_demangle(
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut status,
            );
            assert!(out.is_null());
            assert_eq!(status, DEMANGLE_INVALID_ARGS);

            // A buffer without its capacity is also invalid.
            let mangled = CStr::from_bytes_with_nul(b"_Z3foov\0").unwrap();
            let bogus = libc::malloc(8) as *mut c_char;
            let out = itanium_demangle(mangled.as_ptr(), bogus, ptr::null_mut(), &mut status);
            assert!(out.is_null());
            assert_eq!(status, DEMANGLE_INVALID_ARGS);
            libc::free(bogus as *mut libc::c_void);
        }
    }

    #[test]
    fn caller_buffers_are_grown_in_place() {
        let mangled = CStr::from_bytes_with_nul(b"_ZNSt3vectorIiSaIiEE9push_backEOi\0").unwrap();
        unsafe {
            let mut n: size_t = 4;
            let buf = libc::malloc(n) as *mut c_char;
            let mut status = 0;
            let out = itanium_demangle(mangled.as_ptr(), buf, &mut n, &mut status);
            assert_eq!(status, DEMANGLE_SUCCESS);
            assert!(!out.is_null());

            let expected = "std::vector<int, std::allocator<int> >::push_back(int&&)";
            assert_eq!(CStr::from_ptr(out).to_str().unwrap(), expected);
            assert_eq!(n, expected.len() + 1);
            itanium_demangle_free(out);
        }
    }

    #[test]
    fn mangled_types_demangle_too() {
        let mangled = CStr::from_bytes_with_nul(b"PKc\0").unwrap();
        unsafe {
            assert_eq!(
                demangle_to_string(mangled).expect("should demangle"),
                "char const*"
            );
        }
    }
}
