// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Error handling for NovaDE framebuffer slots.
//!
//! Every fallible operation in this crate reports failure through one of the
//! `thiserror` enums defined here. The slot operations themselves return
//! [`FramebufferError`], which wraps the more specific [`AllocationError`]
//! (the allocator could not produce a buffer) and [`FenceError`] (a release
//! fence did not signal in time). Configuration loading uses [`ConfigError`].

use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

/// A specialized `Result` type for framebuffer slot operations.
pub type Result<T> = std::result::Result<T, FramebufferError>;

/// Error type for the slot operations of a `FenceGatedBuffer`.
#[derive(Debug, Error)]
pub enum FramebufferError {
    /// The allocator could not satisfy the request.
    /// The slot is left empty.
    #[error("Buffer allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    /// The release fence of the current buffer did not signal before the
    /// bounded wait on the resize path ran out. The old buffer and its fence
    /// are still owned by the slot.
    #[error("Wait for release fence failed")]
    ReleaseWait {
        #[source]
        source: FenceError,
    },
}

/// Error type for buffer allocators.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// A zero width or height was requested.
    #[error("Invalid buffer dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The allocator ran out of memory or hit its configured budget.
    #[error("Out of buffer memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    /// The backing device reported an error.
    #[error("Allocator device error: {0}")]
    Device(#[from] std::io::Error),
}

/// Error type for waits on release fences.
#[derive(Debug, Error)]
pub enum FenceError {
    /// The fence did not signal within the given timeout.
    #[error("Release fence did not signal within {0:?}")]
    TimedOut(Duration),

    /// The descriptor is not a pollable fence (`POLLERR`/`POLLNVAL`).
    #[error("Release fence descriptor is invalid")]
    InvalidDescriptor,

    /// `poll(2)` failed.
    #[error("Polling release fence failed: {0}")]
    Poll(#[from] Errno),
}

impl FenceError {
    /// Returns `true` if the wait ran out of time rather than failing outright.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FenceError::TimedOut(_))
    }
}

/// Error type for configuration-related operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while attempting to read a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration parsed but holds invalid values.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Error type for logging initialisation.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured filter directive could not be parsed.
    #[error("Failed to set log filter: {0}")]
    FilterError(String),

    /// A global subscriber was already installed.
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_allocation_error_converts_into_framebuffer_error() {
        let err: FramebufferError = AllocationError::InvalidDimensions { width: 0, height: 16 }.into();
        assert_eq!(format!("{}", err), "Buffer allocation failed: Invalid buffer dimensions 0x16");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_release_wait_keeps_fence_error_as_source() {
        let err = FramebufferError::ReleaseWait {
            source: FenceError::TimedOut(Duration::from_millis(1500)),
        };
        assert_eq!(format!("{}", err), "Wait for release fence failed");
        match err.source().and_then(|s| s.downcast_ref::<FenceError>()) {
            Some(FenceError::TimedOut(d)) => assert_eq!(*d, Duration::from_millis(1500)),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_fence_error_is_timeout() {
        assert!(FenceError::TimedOut(Duration::ZERO).is_timeout());
        assert!(!FenceError::InvalidDescriptor.is_timeout());
        assert!(!FenceError::Poll(Errno::EBADF).is_timeout());
    }

    #[test]
    fn test_config_read_error_has_io_source() {
        let err = ConfigError::ReadError {
            path: PathBuf::from("/etc/novade/framebuffer.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(format!("{}", err).contains("framebuffer.toml"));
        assert_eq!(
            err.source().unwrap().downcast_ref::<std::io::Error>().unwrap().kind(),
            std::io::ErrorKind::PermissionDenied
        );
    }
}
