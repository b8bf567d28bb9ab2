// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Configuration management for framebuffer slots.
//!
//! - [`types`]: the configuration schema, rooted at [`FramebufferConfig`].
//! - [`defaults`]: default values and the timing constants they derive from.
//! - [`loader`]: [`ConfigLoader`], which reads and validates TOML.
//!
//! ```toml
//! [fence]
//! release_wait_timeout_ms = 1500
//!
//! [composition]
//! format = "rgba8888"
//! usage = ["hw_fb", "hw_render", "hw_composer"]
//! afbc = false
//!
//! [scaling]
//! usage = ["sw_read_often", "sw_write_often"]
//!
//! [logging]
//! level = "info"
//! ```

pub mod defaults;
pub mod loader;
pub mod types;

pub use defaults::{DEFAULT_RELEASE_WAIT_TIMEOUT_MS, DISPLAY_WATCHDOG_TIMEOUT_MS};
pub use loader::ConfigLoader;
pub use types::{FenceConfig, FramebufferConfig, LoggingConfig, TargetConfig, UsageFlag};
