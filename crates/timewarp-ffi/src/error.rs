//! FFI error handling

use std::ffi::c_int;

use timewarp_core::WarpResult;

/// Value libc time functions return on failure
pub const FAILURE: c_int = -1;

/// Set the calling thread's `errno`
pub fn set_errno(code: c_int) {
    // SAFETY: the errno location is valid for the lifetime of the thread.
    unsafe {
        *errno_location() = code;
    }
}

/// Read the calling thread's `errno`
pub fn errno() -> c_int {
    // SAFETY: as above.
    unsafe { *errno_location() }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
unsafe fn errno_location() -> *mut c_int {
    libc::__errno_location()
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut c_int {
    libc::__error()
}

/// Convert a result to a libc-style return code, restoring the failure's
/// `errno` so the caller sees exactly what the real clock reported
pub fn result_to_int<T>(result: WarpResult<T>) -> c_int {
    match result {
        Ok(_) => 0,
        Err(e) => {
            set_errno(e.errno());
            FAILURE
        }
    }
}
