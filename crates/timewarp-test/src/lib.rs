//! Timewarp Test Harness
//!
//! This crate provides:
//! - Scripted real clocks with failure injection
//! - Scripted keyboards for the speed sampler
//! - A dilation simulator checking the engine against the exact integral
//!   of speed over real time
//! - End-to-end checks of sampler and engine together

pub mod integration;
pub mod scripted;
pub mod simulator;

pub use integration::*;
pub use scripted::*;
pub use simulator::*;
