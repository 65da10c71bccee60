//! Shared dilation factor
//!
//! One writer (the speed sampler) and any number of readers (every thread
//! querying a dilated clock). The value is an `f64` stored as raw bits in an
//! `AtomicU64`, so readers never see a torn value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Real-time speed
pub const REAL_TIME: f64 = 1.0;

/// Clamp to a positive, finite speed. Returns real time for invalid inputs.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        REAL_TIME
    }
}

#[derive(Debug)]
struct SpeedCell {
    bits: AtomicU64,
}

/// Create a speed cell at real time, returning its single writer and a reader
pub fn speed_channel() -> (SpeedWriter, SpeedReader) {
    let cell = Arc::new(SpeedCell {
        bits: AtomicU64::new(REAL_TIME.to_bits()),
    });
    (
        SpeedWriter {
            cell: Arc::clone(&cell),
        },
        SpeedReader { cell },
    )
}

/// Writer side of the speed cell. Not `Clone`: there is exactly one.
#[derive(Debug)]
pub struct SpeedWriter {
    cell: Arc<SpeedCell>,
}

impl SpeedWriter {
    /// Publish a new speed; invalid values publish real time
    pub fn publish(&self, speed: f64) {
        self.cell
            .bits
            .store(clamp_speed(speed).to_bits(), Ordering::Release);
    }

    /// Another reader of the same cell
    pub fn reader(&self) -> SpeedReader {
        SpeedReader {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// Reader side of the speed cell
#[derive(Clone, Debug)]
pub struct SpeedReader {
    cell: Arc<SpeedCell>,
}

impl SpeedReader {
    /// Latest published speed
    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.cell.bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_real_time() {
        let (_writer, reader) = speed_channel();
        assert_eq!(reader.load(), 1.0);
    }

    #[test]
    fn test_publish_visible_to_all_readers() {
        let (writer, reader) = speed_channel();
        let other = writer.reader();
        writer.publish(4.5);
        assert_eq!(reader.load(), 4.5);
        assert_eq!(other.load(), 4.5);
    }

    #[test]
    fn test_invalid_speed_falls_back_to_real_time() {
        let (writer, reader) = speed_channel();
        writer.publish(3.0);
        writer.publish(f64::NAN);
        assert_eq!(reader.load(), 1.0);
        writer.publish(-2.0);
        assert_eq!(reader.load(), 1.0);
        writer.publish(0.0);
        assert_eq!(reader.load(), 1.0);
        writer.publish(f64::INFINITY);
        assert_eq!(reader.load(), 1.0);
    }

    #[test]
    fn test_cross_thread_publish() {
        let (writer, reader) = speed_channel();
        let handle = std::thread::spawn(move || writer.publish(0.5));
        handle.join().unwrap();
        assert_eq!(reader.load(), 0.5);
    }
}
