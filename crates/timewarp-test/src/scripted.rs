//! Scripted collaborators: a settable clock and a settable keyboard

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use timewarp_core::{ClockId, Modifier, ModifierSet, Timestamp, WarpError, WarpResult};
use timewarp_time::{ModifierSource, RealTimeSource};

#[derive(Default)]
struct ClockState {
    now: HashMap<ClockId, Timestamp>,
    failing: HashSet<ClockId>,
    reads: u64,
}

/// Real time source whose clocks only move when told to.
///
/// `gettimeofday` is served from the `CLOCK_REALTIME` entry. Clocks that were
/// never set read as zero.
#[derive(Default)]
pub struct ScriptedClock {
    state: Mutex<ClockState>,
}

impl ScriptedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every clock in `ids` starting at `start`
    pub fn starting_at(start: Timestamp, ids: &[ClockId]) -> Self {
        let clock = Self::new();
        for id in ids {
            clock.set(*id, start);
        }
        clock
    }

    pub fn set(&self, id: ClockId, t: Timestamp) {
        self.state.lock().now.insert(id, t);
    }

    /// Move every known clock forward by `nanos`
    pub fn advance_nanos(&self, nanos: i128) {
        let mut state = self.state.lock();
        for t in state.now.values_mut() {
            *t = Timestamp::from_nanos(t.as_nanos() + nanos);
        }
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance_nanos((secs * 1e9).round() as i128);
    }

    /// Make reads of `id` fail with `EINVAL` until `recover` is called
    pub fn fail(&self, id: ClockId) {
        self.state.lock().failing.insert(id);
    }

    pub fn recover(&self, id: ClockId) {
        self.state.lock().failing.remove(&id);
    }

    /// Number of successful and failed reads so far
    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }

    fn read(&self, id: ClockId) -> WarpResult<Timestamp> {
        let mut state = self.state.lock();
        state.reads += 1;
        if state.failing.contains(&id) {
            return Err(WarpError::SourceFailed {
                clock: id,
                errno: libc::EINVAL,
            });
        }
        Ok(state.now.get(&id).copied().unwrap_or_default())
    }
}

impl RealTimeSource for ScriptedClock {
    fn wall_clock(&self) -> WarpResult<Timestamp> {
        self.read(ClockId::REALTIME)
    }

    fn clock(&self, id: ClockId) -> WarpResult<Timestamp> {
        self.read(id)
    }
}

/// Keyboard whose held modifiers are set by the test. Clones share state,
/// so one clone can drive a sampler thread while the test holds another.
#[derive(Clone, Default)]
pub struct ScriptedKeys {
    held: Arc<Mutex<ModifierSet>>,
    polls: Arc<AtomicU64>,
}

impl ScriptedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, modifier: Modifier) {
        self.held.lock().insert(modifier);
    }

    pub fn release(&self, modifier: Modifier) {
        self.held.lock().remove(modifier);
    }

    pub fn set(&self, held: ModifierSet) {
        *self.held.lock() = held;
    }

    pub fn release_all(&self) {
        self.set(ModifierSet::empty());
    }

    /// How many times a sampler has polled this keyboard
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }
}

impl ModifierSource for ScriptedKeys {
    fn poll(&mut self) -> ModifierSet {
        self.polls.fetch_add(1, Ordering::Relaxed);
        *self.held.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_clock_moves_only_when_told() {
        let clock = ScriptedClock::starting_at(
            Timestamp::new(10, 0),
            &[ClockId::MONOTONIC, ClockId::REALTIME],
        );
        assert_eq!(clock.clock(ClockId::MONOTONIC).unwrap(), Timestamp::new(10, 0));
        assert_eq!(clock.clock(ClockId::MONOTONIC).unwrap(), Timestamp::new(10, 0));

        clock.advance_secs(0.5);
        assert_eq!(clock.wall_clock().unwrap(), Timestamp::new(10, 500_000_000));
        assert_eq!(clock.clock(ClockId::MONOTONIC_RAW).unwrap(), Timestamp::ZERO);
        assert_eq!(clock.reads(), 4);
    }

    #[test]
    fn test_scripted_clock_failures() {
        let clock = ScriptedClock::new();
        clock.fail(ClockId::MONOTONIC);
        assert_eq!(clock.clock(ClockId::MONOTONIC).unwrap_err().errno(), libc::EINVAL);
        assert!(clock.wall_clock().is_ok());
        clock.recover(ClockId::MONOTONIC);
        assert!(clock.clock(ClockId::MONOTONIC).is_ok());
    }

    #[test]
    fn test_scripted_keys_shared_between_clones() {
        let keys = ScriptedKeys::new();
        let mut polled = keys.clone();

        keys.press(Modifier::LeftShift);
        assert!(polled.poll().contains(Modifier::LeftShift));
        keys.release_all();
        assert!(polled.poll().is_empty());
        assert_eq!(keys.polls(), 2);
    }
}
