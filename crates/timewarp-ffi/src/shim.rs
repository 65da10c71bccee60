//! Process-wide shim state and the dilated entry points

use std::ffi::{c_int, c_void};
use std::sync::OnceLock;

use parking_lot::Mutex;
use timewarp_core::{speed_channel, Channel, ClockId};
use timewarp_input::X11Keyboard;
use timewarp_time::{DilationEngine, NoInput, SamplerConfig, SamplerHandle, SpeedSampler};

use crate::error::result_to_int;
use crate::real::{PreloadSource, RealFns};
use crate::types::{to_timespec, to_timeval};
use crate::{logging, PreloadConfig};

static ENGINE: OnceLock<DilationEngine> = OnceLock::new();
static SAMPLER: Mutex<Option<SamplerHandle>> = parking_lot::const_mutex(None);

/// The process engine, once the shim has started
pub fn engine() -> Option<&'static DilationEngine> {
    ENGINE.get()
}

/// Bring the shim up: logging, engine, keyboard and sampler thread.
/// Calling it again is a no-op.
pub fn start(config: PreloadConfig) {
    let (writer, reader) = speed_channel();
    if ENGINE.set(DilationEngine::new(reader)).is_err() {
        return;
    }

    logging::init(config.log_filter.as_deref());
    apply_preload_policy(&config);

    let sampler_config = SamplerConfig::with_interval(config.poll_interval);
    let sampler = if config.input {
        SpeedSampler::with_fallback(X11Keyboard::open(), writer, sampler_config)
    } else {
        SpeedSampler::new(NoInput, writer, sampler_config)
    };

    match sampler.spawn() {
        Ok(handle) => *SAMPLER.lock() = Some(handle),
        Err(e) => tracing::warn!("{}; speed fixed at real time", e),
    }

    tracing::info!(
        poll_ms = config.poll_interval.as_millis() as u64,
        input = config.input,
        "timewarp active"
    );
}

/// Drop `LD_PRELOAD` so children run at real speed, unless told to keep it
fn apply_preload_policy(config: &PreloadConfig) {
    if !config.keep_preload {
        std::env::remove_var("LD_PRELOAD");
    }
}

/// Whether the sampler thread is running
pub fn sampler_running() -> bool {
    SAMPLER.lock().as_ref().is_some_and(|h| h.is_running())
}

/// Stop the sampler and wait for its thread to exit
pub fn stop() {
    let handle = SAMPLER.lock().take();
    if let Some(handle) = handle {
        tracing::info!("timewarp stopping");
        handle.shutdown();
    }
}

/// `stop` for the library destructor. The exiting thread has already run
/// its thread-local destructors, so nothing on this path may log; logging
/// is switched off once the sampler has joined.
pub fn teardown() {
    let handle = SAMPLER.lock().take();
    if let Some(handle) = handle {
        let _ = handle.shutdown_quiet();
    }
    logging::silence();
}

/// Dilated `gettimeofday`. Without an engine, or without an output struct,
/// the real function answers unchanged.
pub unsafe fn dilated_gettimeofday(
    engine: Option<&DilationEngine>,
    real: &RealFns,
    tv: *mut libc::timeval,
    tz: *mut c_void,
) -> c_int {
    let Some(engine) = engine else {
        return real.gettimeofday(tv, tz);
    };
    if tv.is_null() {
        return real.gettimeofday(tv, tz);
    }

    let source = PreloadSource::with_timezone(real, tz);
    result_to_int(engine.wall_clock(&source).map(|t| {
        *tv = to_timeval(t);
    }))
}

/// Dilated `clock_gettime`. Clocks without a channel go straight to the
/// real function.
pub unsafe fn dilated_clock_gettime(
    engine: Option<&DilationEngine>,
    real: &RealFns,
    clk_id: libc::clockid_t,
    tp: *mut libc::timespec,
) -> c_int {
    let id = ClockId(clk_id);
    let Some(engine) = engine else {
        return real.clock_gettime(clk_id, tp);
    };
    if tp.is_null() || Channel::from_clock_id(id).is_none() {
        return real.clock_gettime(clk_id, tp);
    }

    let source = PreloadSource::new(real);
    result_to_int(engine.clock(&source, id).map(|t| {
        *tp = to_timespec(t);
    }))
}
