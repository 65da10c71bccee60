//! Speed Sampler - turns held modifier keys into a dilation factor
//!
//! The sampler polls its input every `interval` on a dedicated thread and
//! publishes the resulting factor through the speed cell. It never fails the
//! host: missing input degrades to real time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use timewarp_core::{Modifier, ModifierSet, SpeedWriter, WarpError, WarpResult, REAL_TIME};

use crate::{ModifierSource, NoInput};

/// Sampler configuration
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    /// Pause between two polls
    pub interval: Duration,
    /// Multiplier while right shift is held
    pub right_shift: f64,
    /// Multiplier while left shift is held
    pub left_shift: f64,
    /// Divisor while right control is held
    pub right_control: f64,
    /// Divisor while left control is held
    pub left_control: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            interval: Duration::from_millis(20),
            right_shift: 3.0,
            left_shift: 1.5,
            right_control: 3.0,
            left_control: 1.5,
        }
    }
}

impl SamplerConfig {
    /// Configuration with a different poll interval
    pub fn with_interval(interval: Duration) -> Self {
        SamplerConfig {
            interval,
            ..Self::default()
        }
    }

    /// Speed factor for a set of held modifiers.
    ///
    /// Factors are applied in `Modifier::ALL` order (right shift, left shift,
    /// right control, left control) so mixed combinations always round the
    /// same way.
    pub fn speed_for(&self, held: ModifierSet) -> f64 {
        let mut speed = REAL_TIME;
        for modifier in Modifier::ALL {
            if !held.contains(modifier) {
                continue;
            }
            match modifier {
                Modifier::RightShift => speed *= self.right_shift,
                Modifier::LeftShift => speed *= self.left_shift,
                Modifier::RightControl => speed /= self.right_control,
                Modifier::LeftControl => speed /= self.left_control,
            }
        }
        speed
    }
}

/// Speed Sampler - owns the writer side of the speed cell
pub struct SpeedSampler {
    source: Box<dyn ModifierSource>,
    writer: SpeedWriter,
    config: SamplerConfig,
    last: f64,
}

impl SpeedSampler {
    pub fn new<S>(source: S, writer: SpeedWriter, config: SamplerConfig) -> Self
    where
        S: ModifierSource + 'static,
    {
        SpeedSampler {
            source: Box::new(source),
            writer,
            config,
            last: REAL_TIME,
        }
    }

    /// Use `source` if it opened, otherwise sample nothing and stay at real
    /// time
    pub fn with_fallback<S>(
        source: WarpResult<S>,
        writer: SpeedWriter,
        config: SamplerConfig,
    ) -> Self
    where
        S: ModifierSource + 'static,
    {
        match source {
            Ok(source) => Self::new(source, writer, config),
            Err(e) => {
                tracing::warn!("{}; speed fixed at real time", e);
                Self::new(NoInput, writer, config)
            }
        }
    }

    /// Poll the input once and publish the resulting speed
    pub fn tick(&mut self) -> f64 {
        let held = self.source.poll();
        let speed = self.config.speed_for(held);
        self.writer.publish(speed);

        if speed != self.last {
            tracing::debug!(speed, ?held, "speed changed");
            self.last = speed;
        }
        speed
    }

    /// Run the sampling loop on its own thread until the handle is shut down
    pub fn spawn(mut self) -> WarpResult<SamplerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let interval = self.config.interval;

        let thread = thread::Builder::new()
            .name("timewarp-sampler".into())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    self.tick();
                    // nanosleep is relative, so dilated clocks cannot stretch it
                    thread::sleep(interval);
                }
                // Logged from this thread: the stopping thread may be past
                // its thread-local destructors
                tracing::debug!("sampler stopped");
            })
            .map_err(|e| WarpError::SamplerSpawn(e.to_string()))?;

        tracing::debug!(?interval, "sampler started");
        Ok(SamplerHandle {
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Handle to a running sampler thread. Dropping it stops and joins the
/// thread.
pub struct SamplerHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Whether the sampling loop is still running
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for it to exit
    pub fn shutdown(mut self) {
        if !self.stop() {
            tracing::warn!("sampler thread panicked");
        }
    }

    /// Stop the loop and wait for it without logging on the calling thread.
    /// Returns false if the sampler thread panicked.
    ///
    /// For library destructors, which run after the exiting thread's
    /// thread-local storage is gone.
    pub fn shutdown_quiet(mut self) -> bool {
        self.stop()
    }

    fn stop(&mut self) -> bool {
        self.shutdown.store(true, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().is_ok(),
            None => true,
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
