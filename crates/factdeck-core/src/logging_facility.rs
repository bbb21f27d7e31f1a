//! Logging facility
//!
//! Thin wrapper over `tracing` / `tracing-subscriber` providing a single
//! initialization point with per-environment profiles.

pub mod init;

pub use init::{init, Profile};
