//! Timewarp Time Engine - dilated clocks driven by a live speed factor
//!
//! This crate implements:
//! - Per-channel dilation state (wall clock, monotonic, monotonic-raw)
//! - The transform engine turning real timestamps into dilated ones
//! - The real time source seam
//! - The speed sampler that turns held modifier keys into a factor

pub mod clock;
pub mod engine;
pub mod input;
pub mod sampler;
pub mod source;

pub use clock::*;
pub use engine::*;
pub use input::*;
pub use sampler::*;
pub use source::*;
