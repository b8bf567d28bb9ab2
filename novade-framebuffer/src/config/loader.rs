// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Configuration loading.
//!
//! [`ConfigLoader`] reads a TOML file (or string), applies defaults and
//! validates the result. A missing file is not an error: the defaults are
//! used, the same way the rest of NovaDE treats an absent `config.toml`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use super::defaults::DISPLAY_WATCHDOG_TIMEOUT_MS;
use super::FramebufferConfig;
use crate::error::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Namespace for the configuration loading functions.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates the configuration stored at `path`.
    ///
    /// # Returns
    ///
    /// - `Ok(FramebufferConfig)`: the parsed configuration, or the defaults if
    ///   the file does not exist or is empty.
    /// - `Err(ConfigError::ReadError)`: the file exists but cannot be read.
    /// - `Err(ConfigError::ParseError)`: the file is not valid for the schema.
    /// - `Err(ConfigError::ValidationError)`: a value is out of range.
    pub fn load_from_path(path: &Path) -> Result<FramebufferConfig, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loading framebuffer configuration from {:?}", path);
                Self::load_from_str(&content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No framebuffer configuration at {:?}, using defaults", path);
                let config = FramebufferConfig::default();
                Self::validate_config(&config)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Parses and validates a configuration from TOML text.
    pub fn load_from_str(content: &str) -> Result<FramebufferConfig, ConfigError> {
        let mut config: FramebufferConfig = toml::from_str(content)?;
        config.logging.level = config.logging.level.trim().to_lowercase();
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Checks value ranges that the schema cannot express.
    pub fn validate_config(config: &FramebufferConfig) -> Result<(), ConfigError> {
        let timeout = config.fence.release_wait_timeout_ms;
        if timeout == 0 || timeout >= DISPLAY_WATCHDOG_TIMEOUT_MS {
            return Err(ConfigError::ValidationError(format!(
                "fence.release_wait_timeout_ms must be between 1 and {} (got {})",
                DISPLAY_WATCHDOG_TIMEOUT_MS - 1,
                timeout
            )));
        }

        for (name, target) in [("composition", &config.composition), ("scaling", &config.scaling)] {
            if target.usage.as_ref().is_some_and(|usage| usage.is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "{}.usage must name at least one flag",
                    name
                )));
            }
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid levels are: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}
