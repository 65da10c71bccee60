//! End-to-end harness: a sampler thread driving a live engine

use std::thread;
use std::time::{Duration, Instant};

use timewarp_core::{speed_channel, WarpResult};
use timewarp_time::{DilationEngine, SamplerConfig, SamplerHandle, SpeedSampler};

use crate::ScriptedKeys;

/// An engine whose speed comes from a running sampler polling a scripted
/// keyboard
pub struct LiveHarness {
    pub engine: DilationEngine,
    pub keys: ScriptedKeys,
    sampler: Option<SamplerHandle>,
}

impl LiveHarness {
    /// Start a sampler polling every `interval`
    pub fn start(interval: Duration) -> WarpResult<Self> {
        let keys = ScriptedKeys::new();
        let (writer, reader) = speed_channel();
        let sampler = SpeedSampler::new(
            keys.clone(),
            writer,
            SamplerConfig::with_interval(interval),
        )
        .spawn()?;

        Ok(LiveHarness {
            engine: DilationEngine::new(reader),
            keys,
            sampler: Some(sampler),
        })
    }

    /// Wait until the engine sees `speed`, up to `timeout`
    pub fn wait_for_speed(&self, speed: f64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.engine.speed() == speed {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Wait until the sampler has polled at least `n` more times
    pub fn wait_for_polls(&self, n: u64, timeout: Duration) -> bool {
        let target = self.keys.polls() + n;
        let deadline = Instant::now() + timeout;
        while self.keys.polls() < target {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn sampler_running(&self) -> bool {
        self.sampler.as_ref().is_some_and(|s| s.is_running())
    }

    /// Stop and join the sampler
    pub fn stop(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedClock;
    use timewarp_core::{Channel, ClockId, Modifier, Timestamp};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_keys_reach_engine() {
        let mut harness = LiveHarness::start(Duration::from_millis(1)).unwrap();
        assert_eq!(harness.engine.speed(), 1.0);

        harness.keys.press(Modifier::RightShift);
        assert!(harness.wait_for_speed(3.0, TIMEOUT));

        harness.keys.press(Modifier::LeftShift);
        assert!(harness.wait_for_speed(4.5, TIMEOUT));

        harness.keys.release(Modifier::RightShift);
        assert!(harness.wait_for_speed(1.5, TIMEOUT));

        harness.keys.release_all();
        harness.keys.press(Modifier::LeftControl);
        assert!(harness.wait_for_speed(1.0 / 1.5, TIMEOUT));

        harness.stop();
        assert!(!harness.sampler_running());
    }

    #[test]
    fn test_shift_and_control_cancel() {
        let mut harness = LiveHarness::start(Duration::from_millis(1)).unwrap();
        harness.keys.press(Modifier::RightShift);
        harness.keys.press(Modifier::RightControl);
        assert!(harness.wait_for_polls(3, TIMEOUT));
        assert_eq!(harness.engine.speed(), 1.0);
        harness.stop();
    }

    #[test]
    fn test_live_speed_dilates_queries() {
        let mut harness = LiveHarness::start(Duration::from_millis(1)).unwrap();
        let clock = ScriptedClock::starting_at(Timestamp::new(500, 0), &[ClockId::MONOTONIC]);

        let anchor = harness.engine.clock(&clock, ClockId::MONOTONIC).unwrap();
        assert_eq!(anchor, Timestamp::new(500, 0));

        harness.keys.press(Modifier::RightShift);
        assert!(harness.wait_for_speed(3.0, TIMEOUT));
        clock.advance_secs(2.0);
        let fast = harness.engine.clock(&clock, ClockId::MONOTONIC).unwrap();
        assert_eq!(fast, Timestamp::new(506, 0));

        harness.keys.release_all();
        assert!(harness.wait_for_speed(1.0, TIMEOUT));
        clock.advance_secs(1.0);
        let after = harness.engine.clock(&clock, ClockId::MONOTONIC).unwrap();
        assert_eq!(after, Timestamp::new(507, 0));

        assert_eq!(harness.engine.channel_state(Channel::Monotonic).offset, -4.0);
        harness.stop();
    }

    #[test]
    fn test_stopped_sampler_no_longer_polls() {
        let mut harness = LiveHarness::start(Duration::from_millis(1)).unwrap();
        assert!(harness.wait_for_polls(2, TIMEOUT));
        harness.stop();

        let polls = harness.keys.polls();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(harness.keys.polls(), polls);
    }
}
