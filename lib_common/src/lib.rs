//! # lib_common
//!
//! Shared library of the race replay workspace. Every top-level folder is a
//! module gated behind a Cargo feature of the same name, so binaries only
//! compile what they use:
//!
//! - **`replay`**: the interleaving and live-ranking engine (default).
//! - **`feeds`**: session archives and driver stream construction.
//! - **`prediction`**: the one-shot lap-time forecast.
//! - **`session`**: a paced, cancellable broadcast for one consumer.
//! - **`configs`**: layered server configuration.
//! - **`loggers`**: tracing subscriber setup.
//!
//! Enable `full` for everything.

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "feeds")]
pub mod feeds;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "prediction")]
pub mod prediction;
#[cfg(feature = "replay")]
pub mod replay;
#[cfg(feature = "session")]
pub mod session;
