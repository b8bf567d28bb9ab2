// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Logging setup.
//!
//! The slots only emit `tracing` events. Binaries embedding them usually
//! install their own subscriber; these helpers cover tests, tools and
//! standalone use.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::LoggingError;

/// Initializes a minimal logging setup, directing messages to `stderr`.
///
/// Filters by `RUST_LOG`, defaulting to `info`. Errors during initialization
/// (e.g., if a global subscriber is already set) are ignored.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

/// Installs a `stderr` subscriber at the configured level.
///
/// # Errors
///
/// - [`LoggingError::FilterError`] if `config.level` is not a valid filter.
/// - [`LoggingError::InitializationError`] if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&config.level).map_err(|e| LoggingError::FilterError(e.to_string()))?;

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| LoggingError::InitializationError(e.to_string()))
}
