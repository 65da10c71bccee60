//! Timewarp Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every timewarp crate:
//! - Timestamps and clock channels
//! - Modifier keys driving the dilation factor
//! - The single-writer speed cell
//! - Error types

pub mod error;
pub mod input;
pub mod speed;
pub mod time;

pub use error::*;
pub use input::*;
pub use speed::*;
pub use time::*;
