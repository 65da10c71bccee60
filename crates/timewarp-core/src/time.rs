//! Time primitives for timewarp
//!
//! Real timestamps are kept as exact integer seconds + nanoseconds; only the
//! dilation arithmetic (elapsed intervals and the accumulated offset) is done
//! in floating point, so large epoch values never eat into the precision of
//! the offset.

use std::fmt;

const NANOS_PER_SEC: i128 = 1_000_000_000;
const NANOS_PER_MICRO: u32 = 1_000;

/// A point on some clock, normalized so that `0 <= nanos < 1e9`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Build from seconds plus a (possibly unnormalized) nanosecond part
    #[inline]
    pub fn new(secs: i64, nanos: i64) -> Self {
        Self::from_nanos(secs as i128 * NANOS_PER_SEC + nanos as i128)
    }

    /// Build from a `timeval`-style seconds + microseconds pair
    #[inline]
    pub fn from_micros_parts(secs: i64, micros: i64) -> Self {
        Self::new(secs, micros.saturating_mul(NANOS_PER_MICRO as i64))
    }

    /// Build from total nanoseconds. The seconds part is floored, so the
    /// fraction is always non-negative.
    pub fn from_nanos(total: i128) -> Self {
        let secs = total.div_euclid(NANOS_PER_SEC);
        let nanos = total.rem_euclid(NANOS_PER_SEC) as u32;
        match i64::try_from(secs) {
            Ok(secs) => Timestamp { secs, nanos },
            Err(_) if secs < 0 => Timestamp {
                secs: i64::MIN,
                nanos: 0,
            },
            Err(_) => Timestamp {
                secs: i64::MAX,
                nanos: (NANOS_PER_SEC - 1) as u32,
            },
        }
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_nanos((secs * NANOS_PER_SEC as f64).round() as i128)
    }

    #[inline]
    pub fn secs(self) -> i64 {
        self.secs
    }

    #[inline]
    pub fn subsec_nanos(self) -> u32 {
        self.nanos
    }

    /// Sub-second part truncated to microseconds
    #[inline]
    pub fn subsec_micros(self) -> u32 {
        self.nanos / NANOS_PER_MICRO
    }

    #[inline]
    pub fn as_nanos(self) -> i128 {
        self.secs as i128 * NANOS_PER_SEC + self.nanos as i128
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.secs as f64 + self.nanos as f64 / NANOS_PER_SEC as f64
    }

    /// Seconds elapsed since `earlier` (negative if `earlier` is later)
    #[inline]
    pub fn elapsed_since(self, earlier: Timestamp) -> f64 {
        (self.as_nanos() - earlier.as_nanos()) as f64 / NANOS_PER_SEC as f64
    }

    /// `self - offset`, with the offset rounded to the nearest nanosecond
    #[inline]
    pub fn shifted_back(self, offset_secs: f64) -> Self {
        let offset = (offset_secs * NANOS_PER_SEC as f64).round() as i128;
        Self::from_nanos(self.as_nanos() - offset)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nanos)
    }
}

/// Platform clock identifier (`clockid_t`)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockId(pub libc::clockid_t);

impl ClockId {
    pub const REALTIME: ClockId = ClockId(libc::CLOCK_REALTIME);
    pub const MONOTONIC: ClockId = ClockId(libc::CLOCK_MONOTONIC);
    pub const MONOTONIC_RAW: ClockId = ClockId(libc::CLOCK_MONOTONIC_RAW);
}

impl fmt::Debug for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ClockId::REALTIME => write!(f, "CLOCK_REALTIME"),
            ClockId::MONOTONIC => write!(f, "CLOCK_MONOTONIC"),
            ClockId::MONOTONIC_RAW => write!(f, "CLOCK_MONOTONIC_RAW"),
            ClockId(id) => write!(f, "clock#{}", id),
        }
    }
}

/// An independently dilated time source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `gettimeofday`
    WallClock = 0,
    /// `clock_gettime(CLOCK_MONOTONIC)`
    Monotonic = 1,
    /// `clock_gettime(CLOCK_MONOTONIC_RAW)`
    MonotonicRaw = 2,
}

impl Channel {
    pub const COUNT: usize = 3;
    pub const ALL: [Channel; Channel::COUNT] =
        [Channel::WallClock, Channel::Monotonic, Channel::MonotonicRaw];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Channel dilating the given `clock_gettime` id, if any.
    /// Every other id (including `CLOCK_REALTIME`) is passed through.
    pub fn from_clock_id(id: ClockId) -> Option<Channel> {
        match id {
            ClockId::MONOTONIC => Some(Channel::Monotonic),
            ClockId::MONOTONIC_RAW => Some(Channel::MonotonicRaw),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::WallClock => "wall-clock",
            Channel::Monotonic => "monotonic",
            Channel::MonotonicRaw => "monotonic-raw",
        }
    }
}
