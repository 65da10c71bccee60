//! The real libc clocks behind the shim

use std::ffi::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use timewarp_core::{ClockId, Timestamp, WarpError, WarpResult};
use timewarp_time::{last_source_error, RealTimeSource};

use crate::error::{set_errno, FAILURE};
use crate::types::{timestamp_from_timespec, timestamp_from_timeval};

pub type GettimeofdayFn = unsafe extern "C" fn(*mut libc::timeval, *mut c_void) -> c_int;
pub type ClockGettimeFn = unsafe extern "C" fn(libc::clockid_t, *mut libc::timespec) -> c_int;

/// Real implementations of the intercepted functions
#[derive(Clone, Copy, Debug, Default)]
pub struct RealFns {
    pub gettimeofday: Option<GettimeofdayFn>,
    pub clock_gettime: Option<ClockGettimeFn>,
}

static REAL: OnceLock<RealFns> = OnceLock::new();
static REPORTED: AtomicBool = AtomicBool::new(false);

/// Real functions of the process, resolved on first use
pub fn real_fns() -> &'static RealFns {
    if let Some(real) = REAL.get() {
        return real;
    }
    let real = REAL.get_or_init(RealFns::resolve);
    // Reported outside the initializer: a subscriber timestamping the event
    // re-enters this function through the clock hooks
    if !REPORTED.swap(true, Ordering::AcqRel) {
        for symbol in real.missing() {
            tracing::warn!(symbol, "real symbol not found");
        }
    }
    real
}

impl RealFns {
    /// Look up the next definitions after this library
    pub fn resolve() -> Self {
        // SAFETY: the symbols have exactly these C signatures in every libc
        // this shim targets; null results are kept as `None`.
        unsafe {
            RealFns {
                gettimeofday: next_symbol(b"gettimeofday\0")
                    .map(|p| std::mem::transmute::<*mut c_void, GettimeofdayFn>(p)),
                clock_gettime: next_symbol(b"clock_gettime\0")
                    .map(|p| std::mem::transmute::<*mut c_void, ClockGettimeFn>(p)),
            }
        }
    }

    /// Names of the functions that could not be resolved
    pub fn missing(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.gettimeofday.is_none() {
            names.push("gettimeofday");
        }
        if self.clock_gettime.is_none() {
            names.push("clock_gettime");
        }
        names
    }

    /// Call the real `gettimeofday` unchanged
    pub unsafe fn gettimeofday(&self, tv: *mut libc::timeval, tz: *mut c_void) -> c_int {
        match self.gettimeofday {
            Some(f) => f(tv, tz),
            None => missing(),
        }
    }

    /// Call the real `clock_gettime` unchanged
    pub unsafe fn clock_gettime(&self, clk_id: libc::clockid_t, tp: *mut libc::timespec) -> c_int {
        match self.clock_gettime {
            Some(f) => f(clk_id, tp),
            None => missing(),
        }
    }
}

unsafe fn next_symbol(name: &[u8]) -> Option<*mut c_void> {
    let ptr = libc::dlsym(libc::RTLD_NEXT, name.as_ptr() as *const c_char);
    (!ptr.is_null()).then_some(ptr)
}

fn missing() -> c_int {
    set_errno(libc::ENOSYS);
    FAILURE
}

/// `RealTimeSource` over the resolved functions, carrying the caller's
/// timezone argument through to the real `gettimeofday`
pub struct PreloadSource<'a> {
    real: &'a RealFns,
    tz: *mut c_void,
}

impl<'a> PreloadSource<'a> {
    pub fn new(real: &'a RealFns) -> Self {
        Self::with_timezone(real, std::ptr::null_mut())
    }

    pub fn with_timezone(real: &'a RealFns, tz: *mut c_void) -> Self {
        PreloadSource { real, tz }
    }
}

impl RealTimeSource for PreloadSource<'_> {
    fn wall_clock(&self) -> WarpResult<Timestamp> {
        let f = self
            .real
            .gettimeofday
            .ok_or(WarpError::SymbolUnavailable("gettimeofday"))?;
        let mut tv = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is writable; `tz` is whatever the caller handed us.
        if unsafe { f(&mut tv, self.tz) } != 0 {
            return Err(last_source_error(ClockId::REALTIME));
        }
        Ok(timestamp_from_timeval(&tv))
    }

    fn clock(&self, id: ClockId) -> WarpResult<Timestamp> {
        let f = self
            .real
            .clock_gettime
            .ok_or(WarpError::SymbolUnavailable("clock_gettime"))?;
        let mut tp = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `tp` is writable.
        if unsafe { f(id.0, &mut tp) } != 0 {
            return Err(last_source_error(id));
        }
        Ok(timestamp_from_timespec(&tp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::errno;

    unsafe extern "C" fn broken_clock(_id: libc::clockid_t, _tp: *mut libc::timespec) -> c_int {
        set_errno(libc::EINVAL);
        -1
    }

    unsafe extern "C" fn fixed_clock(_id: libc::clockid_t, tp: *mut libc::timespec) -> c_int {
        (*tp).tv_sec = 9;
        (*tp).tv_nsec = 5;
        0
    }

    #[test]
    fn test_resolves_libc_clocks() {
        let real = RealFns::resolve();
        assert!(real.gettimeofday.is_some());
        assert!(real.clock_gettime.is_some());
        assert!(real.missing().is_empty());
        assert!(real_fns().missing().is_empty());

        let now = PreloadSource::new(&real).clock(ClockId::MONOTONIC).unwrap();
        assert!(now > Timestamp::ZERO);
    }

    #[test]
    fn test_missing_symbol() {
        let real = RealFns::default();
        assert_eq!(real.missing(), ["gettimeofday", "clock_gettime"]);
        let err = PreloadSource::new(&real).wall_clock().unwrap_err();
        assert_eq!(err, WarpError::SymbolUnavailable("gettimeofday"));

        set_errno(0);
        assert_eq!(unsafe { real.clock_gettime(libc::CLOCK_MONOTONIC, std::ptr::null_mut()) }, -1);
        assert_eq!(errno(), libc::ENOSYS);
    }

    #[test]
    fn test_source_failure_carries_errno() {
        let real = RealFns {
            gettimeofday: None,
            clock_gettime: Some(broken_clock),
        };
        let err = PreloadSource::new(&real).clock(ClockId::MONOTONIC).unwrap_err();
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn test_source_success() {
        let real = RealFns {
            gettimeofday: None,
            clock_gettime: Some(fixed_clock),
        };
        let t = PreloadSource::new(&real).clock(ClockId::MONOTONIC_RAW).unwrap();
        assert_eq!(t, Timestamp::new(9, 5));
    }
}
