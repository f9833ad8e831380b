//! Verso CLI Library
//!
//! Terminal front end for daily chapter listening: resolves the plan day to
//! chapter segments and drives the playback service from stdin commands.
//!
//! This library exposes the core components for testing purposes.

pub mod commands;
pub mod config;
pub mod error;
pub mod reading;
pub mod state;

// Re-export commonly used types for convenience
pub use commands::UserCommand;
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use reading::{format_time, DayReading};
pub use state::DayState;
