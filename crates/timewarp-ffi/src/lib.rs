#![allow(clippy::missing_safety_doc)]
//! Timewarp FFI - preload shim
//!
//! Built as `libtimewarp.so` and injected with `LD_PRELOAD`. The library
//! exports `gettimeofday` and `clock_gettime`, forwards them through the
//! dilation engine and reaches the real implementations with
//! `dlsym(RTLD_NEXT, ..)`.
//!
//! Nothing in this crate may call libc's time functions by name: inside the
//! shared object those names bind to the hooks themselves.

pub mod config;
pub mod error;
pub mod logging;
pub mod real;
pub mod shim;
pub mod types;

#[cfg(not(test))]
pub mod hooks;

pub use config::*;
pub use error::*;
pub use real::*;
pub use shim::*;
pub use types::*;
