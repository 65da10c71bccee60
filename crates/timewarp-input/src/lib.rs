//! Timewarp Input - live modifier state from the X server
//!
//! libX11 is loaded at runtime, so a process without the library or without
//! a display still starts; the sampler just falls back to real time.

pub mod x11;

pub use x11::*;
