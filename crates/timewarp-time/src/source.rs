//! Real (undilated) time sources

use timewarp_core::{ClockId, Timestamp, WarpError, WarpResult};

/// Access to the real clocks the engine dilates.
///
/// Implementations must reach the unmodified system clocks. Inside the
/// preload shim that means symbols resolved behind the shim itself, never the
/// process-visible `clock_gettime`.
pub trait RealTimeSource {
    /// Real `gettimeofday`
    fn wall_clock(&self) -> WarpResult<Timestamp>;

    /// Real `clock_gettime` for any clock id
    fn clock(&self, id: ClockId) -> WarpResult<Timestamp>;
}

impl<T: RealTimeSource + ?Sized> RealTimeSource for &T {
    fn wall_clock(&self) -> WarpResult<Timestamp> {
        (**self).wall_clock()
    }

    fn clock(&self, id: ClockId) -> WarpResult<Timestamp> {
        (**self).clock(id)
    }
}

/// The calling thread's current `errno` as a source failure
pub fn last_source_error(clock: ClockId) -> WarpError {
    WarpError::SourceFailed {
        clock,
        errno: std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EINVAL),
    }
}

/// Direct libc clocks, for processes that link the engine in rather than
/// preloading it
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl RealTimeSource for SystemClock {
    fn wall_clock(&self) -> WarpResult<Timestamp> {
        let mut tv = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid, writable timeval; a null timezone is allowed.
        let ret = unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) };
        if ret != 0 {
            return Err(last_source_error(ClockId::REALTIME));
        }
        Ok(Timestamp::from_micros_parts(
            tv.tv_sec as i64,
            tv.tv_usec as i64,
        ))
    }

    fn clock(&self, id: ClockId) -> WarpResult<Timestamp> {
        let mut tp = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `tp` is a valid, writable timespec.
        let ret = unsafe { libc::clock_gettime(id.0, &mut tp) };
        if ret != 0 {
            return Err(last_source_error(id));
        }
        Ok(Timestamp::new(tp.tv_sec as i64, tp.tv_nsec as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_monotonic_advances() {
        let clock = SystemClock;
        let a = clock.clock(ClockId::MONOTONIC).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.clock(ClockId::MONOTONIC).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_system_wall_clock_is_after_2020() {
        let now = SystemClock.wall_clock().unwrap();
        assert!(now.secs() > 1_577_836_800);
    }

    #[test]
    fn test_invalid_clock_reports_errno() {
        let err = SystemClock.clock(ClockId(-12345)).unwrap_err();
        assert!(matches!(
            err,
            WarpError::SourceFailed { errno, .. } if errno == libc::EINVAL
        ));
    }
}
