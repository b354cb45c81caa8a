//! OSOROM simulator driver library: built-in programs, ROM loading and the
//! program runner behind the `osorom-sim` binary.

#[cfg(test)]
use tempfile as _;
use tracing_subscriber as _;

/// Built-in reference ROM programs.
pub mod programs;
/// ROM text loading and integer literal parsing.
pub mod rom;
/// Program execution and result reporting.
pub mod runner;
