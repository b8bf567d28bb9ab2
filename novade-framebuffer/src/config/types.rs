// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Configuration data structures.
//!
//! All structs reject unknown fields and fall back to the values in
//! [`super::defaults`] for anything not present in the file.

use std::time::Duration;

use serde::Deserialize;

use super::defaults;
use crate::allocator::{BufferUsage, PixelFormat};
use crate::criteria::AllocationParams;

/// Root configuration of the framebuffer slots.
///
/// # Examples
///
/// ```
/// use novade_framebuffer::config::FramebufferConfig;
///
/// let config: FramebufferConfig = toml::from_str(r#"
/// [fence]
/// release_wait_timeout_ms = 1000
///
/// [composition]
/// afbc = true
/// "#).unwrap();
/// assert_eq!(config.fence.release_wait_timeout_ms, 1000);
/// assert!(config.composition.afbc);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FramebufferConfig {
    #[serde(default = "defaults::default_fence_config")]
    pub fence: FenceConfig,
    /// Overrides for the composition target.
    #[serde(default)]
    pub composition: TargetConfig,
    /// Overrides for the scaling/rotation target.
    #[serde(default)]
    pub scaling: TargetConfig,
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

impl FramebufferConfig {
    /// Allocation parameters of the composition target.
    pub fn composition_params(&self) -> AllocationParams {
        self.composition.resolve(AllocationParams::composition())
    }

    /// Allocation parameters of the scaling target.
    pub fn scaling_params(&self) -> AllocationParams {
        self.scaling.resolve(AllocationParams::scaling())
    }
}

/// Release fence handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FenceConfig {
    /// Bounded wait on a pending release fence before a buffer is reallocated.
    #[serde(default = "defaults::default_release_wait_timeout_ms")]
    pub release_wait_timeout_ms: u64,
}

impl FenceConfig {
    pub fn release_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.release_wait_timeout_ms)
    }
}

impl Default for FenceConfig {
    fn default() -> Self {
        defaults::default_fence_config()
    }
}

/// Per-target overrides. Unset values keep the target's preset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Format used when the request does not name one.
    #[serde(default)]
    pub format: Option<PixelFormat>,
    #[serde(default)]
    pub usage: Option<Vec<UsageFlag>>,
    /// Request the compressed layout for pre-composition and squash layers.
    #[serde(default)]
    pub afbc: bool,
}

impl TargetConfig {
    fn resolve(&self, preset: AllocationParams) -> AllocationParams {
        let mut params = preset;
        if let Some(format) = self.format {
            params.format = format;
        }
        if let Some(usage) = &self.usage {
            params.usage = usage.iter().fold(BufferUsage::empty(), |acc, flag| acc | BufferUsage::from(*flag));
        }
        params.with_afbc(self.afbc || params.usage.contains(BufferUsage::AFBC))
    }
}

/// Configuration names of the [`BufferUsage`] bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageFlag {
    SwReadOften,
    SwWriteOften,
    HwTexture,
    HwRender,
    HwComposer,
    HwFb,
    Afbc,
}

impl From<UsageFlag> for BufferUsage {
    fn from(flag: UsageFlag) -> Self {
        match flag {
            UsageFlag::SwReadOften => BufferUsage::SW_READ_OFTEN,
            UsageFlag::SwWriteOften => BufferUsage::SW_WRITE_OFTEN,
            UsageFlag::HwTexture => BufferUsage::HW_TEXTURE,
            UsageFlag::HwRender => BufferUsage::HW_RENDER,
            UsageFlag::HwComposer => BufferUsage::HW_COMPOSER,
            UsageFlag::HwFb => BufferUsage::HW_FB,
            UsageFlag::Afbc => BufferUsage::AFBC,
        }
    }
}

/// Configuration of the logging subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level: "trace", "debug", "info", "warn" or "error".
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}
