// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for proximity monitoring.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! console logging and the `monitor` and `analyze` command implementations.

// Modules
/// Pose export analysis.
pub mod analyze;

/// CLI arguments.
pub mod args;

/// Console logging macros.
pub mod logging;

/// Image and stream monitoring.
pub mod monitor;
