//! Preload configuration from the host environment

use std::time::Duration;

/// `tracing` filter directive; logging is off when unset
pub const ENV_LOG: &str = "TIMEWARP_LOG";
/// Sampler poll interval in milliseconds
pub const ENV_POLL_MS: &str = "TIMEWARP_POLL_MS";
/// Keep `LD_PRELOAD` so child processes are dilated too
pub const ENV_KEEP_PRELOAD: &str = "TIMEWARP_KEEP_PRELOAD";
/// Skip the X11 keyboard and stay at real time
pub const ENV_NO_INPUT: &str = "TIMEWARP_NO_INPUT";

const MIN_POLL_MS: u64 = 1;
const MAX_POLL_MS: u64 = 1_000;

/// Preload configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreloadConfig {
    /// Filter for the stderr log subscriber
    pub log_filter: Option<String>,
    /// Sampler poll interval
    pub poll_interval: Duration,
    /// Leave `LD_PRELOAD` in the environment
    pub keep_preload: bool,
    /// Poll the keyboard for speed changes
    pub input: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        PreloadConfig {
            log_filter: None,
            poll_interval: Duration::from_millis(20),
            keep_preload: false,
            input: true,
        }
    }
}

impl PreloadConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any variable lookup. Unparseable values
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.log_filter = lookup(ENV_LOG).filter(|f| !f.trim().is_empty());

        if let Some(ms) = lookup(ENV_POLL_MS).and_then(|v| v.trim().parse::<u64>().ok()) {
            if (MIN_POLL_MS..=MAX_POLL_MS).contains(&ms) {
                config.poll_interval = Duration::from_millis(ms);
            }
        }

        if let Some(keep) = lookup(ENV_KEEP_PRELOAD) {
            config.keep_preload = parse_flag(&keep);
        }
        if let Some(no_input) = lookup(ENV_NO_INPUT) {
            config.input = !parse_flag(&no_input);
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
