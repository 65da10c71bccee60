//! Dilation Simulator - drives the engine with a scripted clock
//!
//! Simulates:
//! - A host process querying one channel at jittered intervals
//! - Live speed changes following a schedule
//! - Independent channels queried side by side
//!
//! Every dilated reading is checked against the exact dilated time: the
//! anchor plus the sum of `speed * elapsed` over every interval so far.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use timewarp_core::{speed_channel, Channel, ClockId, SpeedWriter, Timestamp};
use timewarp_time::DilationEngine;

use crate::ScriptedClock;

/// How far apart successive host queries are
#[derive(Clone, Debug)]
pub struct QueryPattern {
    /// Mean gap between queries
    pub mean_gap: Duration,
    /// Uniform jitter applied to each gap (never below 1us)
    pub jitter: Duration,
}

impl QueryPattern {
    pub fn new(mean_gap: Duration, jitter: Duration) -> Self {
        QueryPattern { mean_gap, jitter }
    }

    /// A game loop polling at 60Hz
    pub fn frame_loop() -> Self {
        Self::new(Duration::from_micros(16_667), Duration::from_micros(2_000))
    }

    /// Busy loop querying every few microseconds
    pub fn busy() -> Self {
        Self::new(Duration::from_micros(5), Duration::from_micros(4))
    }

    fn next_gap(&self, rng: &mut StdRng) -> i128 {
        let mean = self.mean_gap.as_nanos() as i128;
        let jitter = self.jitter.as_nanos() as i128;
        let delta = if jitter > 0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0
        };
        (mean + delta).max(1_000)
    }
}

/// Speed held for a stretch of real time
#[derive(Clone, Copy, Debug)]
pub struct SpeedStep {
    pub speed: f64,
    pub duration: Duration,
}

impl SpeedStep {
    pub fn new(speed: f64, duration: Duration) -> Self {
        SpeedStep { speed, duration }
    }
}

/// Simulation of one engine against a scripted clock
pub struct DilationSimulator {
    engine: DilationEngine,
    writer: SpeedWriter,
    clock: ScriptedClock,
    pattern: QueryPattern,
    rng: StdRng,
}

impl DilationSimulator {
    /// New simulator with every clock starting at `start`
    pub fn new(start: Timestamp, pattern: QueryPattern, seed: u64) -> Self {
        let (writer, reader) = speed_channel();
        DilationSimulator {
            engine: DilationEngine::new(reader),
            writer,
            clock: ScriptedClock::starting_at(
                start,
                &[ClockId::REALTIME, ClockId::MONOTONIC, ClockId::MONOTONIC_RAW],
            ),
            pattern,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn engine(&self) -> &DilationEngine {
        &self.engine
    }

    pub fn clock(&self) -> &ScriptedClock {
        &self.clock
    }

    /// Run a speed schedule, querying `channel` throughout
    pub fn run(&mut self, channel: Channel, schedule: &[SpeedStep]) -> SimulationResult {
        let mut result = SimulationResult::default();

        let anchor = self.query(channel);
        let mut expected = 0.0;
        let mut last_real = self.real(channel);
        let mut last_out = anchor;
        result.record(0.0, expected, true);

        for step in schedule {
            self.writer.publish(step.speed);
            let mut remaining = step.duration.as_nanos() as i128;

            while remaining > 0 {
                let gap = self.pattern.next_gap(&mut self.rng).min(remaining);
                remaining -= gap;
                self.clock.advance_nanos(gap);

                let out = self.query(channel);
                let real = self.real(channel);
                expected += step.speed * real.elapsed_since(last_real);
                result.record(out.elapsed_since(anchor), expected, out > last_out);

                last_real = real;
                last_out = out;
            }
        }

        result
    }

    fn query(&self, channel: Channel) -> Timestamp {
        let out = match channel {
            Channel::WallClock => self.engine.wall_clock(&self.clock),
            Channel::Monotonic => self.engine.clock(&self.clock, ClockId::MONOTONIC),
            Channel::MonotonicRaw => self.engine.clock(&self.clock, ClockId::MONOTONIC_RAW),
        };
        // Scripted clocks only fail when told to
        out.unwrap_or_default()
    }

    fn real(&self, channel: Channel) -> Timestamp {
        self.engine.channel_state(channel).last_real
    }
}

/// Simulation result and statistics
///
/// Spans are measured from the anchoring query, so they stay precise at any
/// epoch.
#[derive(Debug, Default)]
pub struct SimulationResult {
    /// Dilated readings taken
    pub samples: u64,
    /// Largest distance from the exact dilated time (seconds)
    pub max_error: f64,
    /// Every reading was later than the previous one
    pub monotonic: bool,
    /// Dilated seconds between the anchor and the last reading
    pub dilated_span: f64,
    /// Exact dilated seconds between the anchor and the last reading
    pub expected_span: f64,
}

impl SimulationResult {
    fn record(&mut self, span: f64, expected: f64, increased: bool) {
        if self.samples == 0 {
            self.monotonic = true;
        }
        self.samples += 1;
        self.max_error = self.max_error.max((span - expected).abs());
        self.monotonic &= increased;
        self.dilated_span = span;
        self.expected_span = expected;
    }
}

/// Predefined speed schedules
pub mod scenarios {
    use super::*;

    /// Hold right shift for a second, then let go
    pub fn fast_burst() -> Vec<SpeedStep> {
        vec![
            SpeedStep::new(1.0, Duration::from_secs(1)),
            SpeedStep::new(3.0, Duration::from_secs(1)),
            SpeedStep::new(1.0, Duration::from_secs(1)),
        ]
    }

    /// Both controls held: slow motion at 1/4.5
    pub fn slow_motion() -> Vec<SpeedStep> {
        vec![SpeedStep::new(1.0 / 3.0 / 1.5, Duration::from_secs(9))]
    }

    /// Every single-key factor in turn
    pub fn key_sweep() -> Vec<SpeedStep> {
        [1.0, 3.0, 1.5, 1.0 / 3.0, 1.0 / 1.5, 4.5, 1.0]
            .into_iter()
            .map(|s| SpeedStep::new(s, Duration::from_millis(500)))
            .collect()
    }
}
