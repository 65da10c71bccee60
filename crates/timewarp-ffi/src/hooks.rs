//! Exported symbols interposed over libc

use std::ffi::{c_int, c_void};

use crate::real::real_fns;
use crate::shim;

#[no_mangle]
pub unsafe extern "C" fn gettimeofday(tv: *mut libc::timeval, tz: *mut c_void) -> c_int {
    shim::dilated_gettimeofday(shim::engine(), real_fns(), tv, tz)
}

#[no_mangle]
pub unsafe extern "C" fn clock_gettime(clk_id: libc::clockid_t, tp: *mut libc::timespec) -> c_int {
    shim::dilated_clock_gettime(shim::engine(), real_fns(), clk_id, tp)
}

extern "C" fn timewarp_init() {
    let config = crate::PreloadConfig::from_env();
    if std::panic::catch_unwind(|| shim::start(config)).is_err() {
        // Unwinding out of a constructor would abort the host
        let _ = std::panic::catch_unwind(shim::stop);
    }
}

extern "C" fn timewarp_fini() {
    let _ = std::panic::catch_unwind(shim::teardown);
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[used]
#[link_section = ".init_array"]
static INIT: extern "C" fn() = timewarp_init;

#[cfg(any(target_os = "linux", target_os = "android"))]
#[used]
#[link_section = ".fini_array"]
static FINI: extern "C" fn() = timewarp_fini;
