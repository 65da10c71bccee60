//! Per-channel dilation state

use timewarp_core::Timestamp;

/// Dilation state of one channel
///
/// INVARIANT: the dilated value handed out is always `real - offset`, and
/// `offset` only ever grows by `(1 - speed) * elapsed` for the interval since
/// the previous observation. Past intervals are never rescaled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelState {
    /// Last real timestamp observed on this channel
    pub last_real: Timestamp,
    /// Seconds subtracted from real time to get dilated time
    pub offset: f64,
    /// False until the first observation anchors the channel
    pub initialized: bool,
}

impl ChannelState {
    /// Fresh, unanchored state
    pub const fn new() -> Self {
        ChannelState {
            last_real: Timestamp::ZERO,
            offset: 0.0,
            initialized: false,
        }
    }

    /// Feed one real observation taken while `speed` was in effect and
    /// return the dilated timestamp.
    ///
    /// The first observation anchors the channel: dilated equals real.
    pub fn advance(&mut self, real: Timestamp, speed: f64) -> Timestamp {
        if !self.initialized {
            self.last_real = real;
            self.offset = 0.0;
            self.initialized = true;
        }

        let elapsed = real.elapsed_since(self.last_real);
        self.offset += (1.0 - speed) * elapsed;
        self.last_real = real;

        real.shifted_back(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs)
    }

    #[test]
    fn test_first_observation_is_identity() {
        let mut state = ChannelState::new();
        assert!(!state.initialized);

        let out = state.advance(ts(42.5), 3.0);
        assert_eq!(out, ts(42.5));
        assert!(state.initialized);
        assert_eq!(state.offset, 0.0);
        assert_eq!(state.last_real, ts(42.5));
    }

    #[test]
    fn test_speed_change_scenario() {
        let mut state = ChannelState::new();

        assert_eq!(state.advance(ts(100.0), 1.0), ts(100.0));
        assert_eq!(state.advance(ts(101.0), 3.0), ts(103.0));
        assert_eq!(state.offset, -2.0);
        assert_eq!(state.advance(ts(102.0), 1.0), ts(104.0));
        assert_eq!(state.offset, -2.0);
    }

    #[test]
    fn test_slow_motion() {
        let mut state = ChannelState::new();
        state.advance(ts(10.0), 1.0);

        // Half speed for 2s of real time: 1s of dilated time passes
        let out = state.advance(ts(12.0), 0.5);
        assert_eq!(out, ts(11.0));
        assert_eq!(state.offset, 1.0);
    }

    #[test]
    fn test_backwards_step_uses_same_formula() {
        let mut state = ChannelState::new();
        state.advance(ts(50.0), 1.0);
        state.advance(ts(52.0), 2.0);
        assert_eq!(state.offset, -2.0);

        // Clock stepped back 1s while still at 2x
        let out = state.advance(ts(51.0), 2.0);
        assert_eq!(state.offset, -1.0);
        assert_eq!(out, ts(52.0));
    }
}
