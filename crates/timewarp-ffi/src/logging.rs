//! Log output for the preload shim
//!
//! The host process owns stderr, so nothing is installed unless a filter was
//! configured, and an existing global subscriber is left in place.

use std::sync::OnceLock;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install a stderr subscriber for `filter`, if any
pub fn init(filter: Option<&str>) {
    let Some(filter) = filter else {
        return;
    };

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Turn the shim's subscriber off for good.
///
/// Disabled events stop at the level check in the macros, before the
/// formatter touches its thread-local buffer, so hooks called after the
/// exiting thread's thread-local destructors stay quiet instead of panicking.
pub fn silence() {
    if let Some(handle) = FILTER.get() {
        let _ = handle.modify(|filter| *filter = EnvFilter::new("off"));
    }
}

/// Whether `init` installed the shim's own subscriber
pub fn installed() -> bool {
    FILTER.get().is_some()
}
