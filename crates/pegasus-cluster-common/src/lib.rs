//! Common types for pegasus-cluster: errors, convergence polling, and telemetry

#![deny(missing_docs)]

pub mod error;
pub mod poll;
pub mod telemetry;

pub use error::Error;
pub use poll::{poll_until, PollConfig, Probe};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
