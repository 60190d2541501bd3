//! Core types for the oxidized-cube boot orchestrator
//!
//! This crate provides the foundational types, error handling,
//! configuration, and logging infrastructure shared by every other crate.

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod region;

pub use config::Config;
pub use error::{
    BootError, DiscError, EmulatorError, IosError, LoaderError, MemoryError, Result,
    UnreadableReason,
};
pub use host::{AlertLevel, Host, LogHost, RecordingHost};
pub use region::{Platform, Region};
