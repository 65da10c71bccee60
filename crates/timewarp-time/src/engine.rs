//! Dilation Engine - turns real clock readings into dilated ones
//!
//! One engine serves the whole process. Each channel is guarded by its own
//! lock, so queries on different channels never contend and queries on the
//! same channel are applied one at a time.

use parking_lot::Mutex;
use timewarp_core::{Channel, ClockId, SpeedReader, Timestamp, WarpResult};

use crate::{ChannelState, RealTimeSource};

/// Dilation Engine - per-channel state plus the live speed
pub struct DilationEngine {
    /// Channel state, indexed by `Channel::index`
    channels: [Mutex<ChannelState>; Channel::COUNT],
    /// Speed published by the sampler
    speed: SpeedReader,
}

impl DilationEngine {
    /// Create an engine with every channel unanchored
    pub fn new(speed: SpeedReader) -> Self {
        DilationEngine {
            channels: std::array::from_fn(|_| Mutex::new(ChannelState::new())),
            speed,
        }
    }

    /// Current speed factor
    pub fn speed(&self) -> f64 {
        self.speed.load()
    }

    /// Dilate an already obtained real timestamp on `channel`
    pub fn transform(&self, channel: Channel, real: Timestamp) -> Timestamp {
        let mut state = self.channels[channel.index()].lock();
        self.advance(channel, &mut state, real)
    }

    /// Dilated `gettimeofday`
    pub fn wall_clock<S>(&self, source: &S) -> WarpResult<Timestamp>
    where
        S: RealTimeSource + ?Sized,
    {
        self.observe(Channel::WallClock, || source.wall_clock())
    }

    /// Dilated `clock_gettime`. Clock ids without a channel are passed
    /// straight through to the real source.
    pub fn clock<S>(&self, source: &S, id: ClockId) -> WarpResult<Timestamp>
    where
        S: RealTimeSource + ?Sized,
    {
        match Channel::from_clock_id(id) {
            Some(channel) => self.observe(channel, || source.clock(id)),
            None => source.clock(id),
        }
    }

    /// Snapshot of one channel's state
    pub fn channel_state(&self, channel: Channel) -> ChannelState {
        *self.channels[channel.index()].lock()
    }

    fn observe<F>(&self, channel: Channel, read: F) -> WarpResult<Timestamp>
    where
        F: FnOnce() -> WarpResult<Timestamp>,
    {
        // The real clock is read under the lock so that observations are
        // applied in the order they were taken. A failed read returns before
        // the state is touched.
        let mut state = self.channels[channel.index()].lock();
        let real = read()?;
        Ok(self.advance(channel, &mut state, real))
    }

    fn advance(&self, channel: Channel, state: &mut ChannelState, real: Timestamp) -> Timestamp {
        let anchoring = !state.initialized;
        let dilated = state.advance(real, self.speed.load());
        if anchoring {
            tracing::debug!(channel = channel.name(), ?real, "channel anchored");
        }
        dilated
    }
}
