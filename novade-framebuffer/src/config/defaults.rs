// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Default configuration values.
//!
//! These functions are used by `serde`'s `default` attribute in the
//! configuration structures when a value is not specified.

use crate::config::{FenceConfig, LoggingConfig};

/// Release-fence wait on the resize path. Somewhat arbitrary, but it has to
/// stay below [`DISPLAY_WATCHDOG_TIMEOUT_MS`].
pub const DEFAULT_RELEASE_WAIT_TIMEOUT_MS: u64 = 1500;

/// The display service's own watchdog for a stuck frame.
pub const DISPLAY_WATCHDOG_TIMEOUT_MS: u64 = 3000;

/// Returns the default release wait timeout in milliseconds (`1500`).
pub(super) fn default_release_wait_timeout_ms() -> u64 {
    DEFAULT_RELEASE_WAIT_TIMEOUT_MS
}

/// Returns the default `FenceConfig`.
pub(super) fn default_fence_config() -> FenceConfig {
    FenceConfig {
        release_wait_timeout_ms: default_release_wait_timeout_ms(),
    }
}

/// Returns the default log level string (`"info"`).
pub(super) fn default_log_level() -> String {
    "info".to_string()
}

/// Returns the default `LoggingConfig`.
pub(super) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
    }
}
