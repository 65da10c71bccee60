//! Conversions between libc time structs and timestamps

use timewarp_core::Timestamp;

#[inline]
pub fn timestamp_from_timeval(tv: &libc::timeval) -> Timestamp {
    Timestamp::from_micros_parts(tv.tv_sec as i64, tv.tv_usec as i64)
}

#[inline]
pub fn timestamp_from_timespec(tp: &libc::timespec) -> Timestamp {
    Timestamp::new(tp.tv_sec as i64, tp.tv_nsec as i64)
}

/// Whole seconds floor, microseconds truncated
#[inline]
pub fn to_timeval(t: Timestamp) -> libc::timeval {
    libc::timeval {
        tv_sec: t.secs() as libc::time_t,
        tv_usec: t.subsec_micros() as libc::suseconds_t,
    }
}

#[inline]
pub fn to_timespec(t: Timestamp) -> libc::timespec {
    libc::timespec {
        tv_sec: t.secs() as libc::time_t,
        tv_nsec: t.subsec_nanos() as libc::c_long,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeval_truncates_to_micros() {
        let tv = to_timeval(Timestamp::new(103, 999_999_999));
        assert_eq!(tv.tv_sec, 103);
        assert_eq!(tv.tv_usec, 999_999);
    }

    #[test]
    fn test_timespec_keeps_nanos() {
        let t = Timestamp::new(7, 123_456_789);
        let tp = to_timespec(t);
        assert_eq!(tp.tv_sec, 7);
        assert_eq!(tp.tv_nsec, 123_456_789);
        assert_eq!(timestamp_from_timespec(&tp), t);
    }

    #[test]
    fn test_timeval_in() {
        let tv = libc::timeval {
            tv_sec: 100,
            tv_usec: 500_000,
        };
        assert_eq!(timestamp_from_timeval(&tv), Timestamp::new(100, 500_000_000));
    }
}
