// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! # Novade Framebuffer
//!
//! Render-target buffer slots for the Novade display pipeline. A slot holds a
//! single hardware-backed pixel buffer together with the release fence of
//! its last submission to a consumer (scanout or a scaling engine), and
//! decides when that buffer may be reused, when it must be waited on, and
//! when it can be dropped.
//!
//! - [`slot`]: the [`FenceGatedBuffer`] state machine and its two flavours,
//!   [`Framebuffer`] and [`ScalingBuffer`].
//! - [`fence`]: the [`ReleaseFence`] trait and the sync_file implementation.
//! - [`allocator`]: the [`BufferAllocator`] trait, buffer vocabulary and the
//!   heap (and optionally GBM) allocators.
//! - [`criteria`]: reuse keys and allocation presets.
//! - [`config`], [`logging`], [`error`]: the usual infrastructure.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use novade_framebuffer::{Framebuffer, HeapAllocator, SyncFileFence};
//!
//! # fn release_fence_from_display() -> SyncFileFence { unimplemented!() }
//! let mut target: Framebuffer<HeapAllocator> = Framebuffer::composition(HeapAllocator::new());
//! target.allocate((1920, 1080))?;
//! // ... render and submit to the display ...
//! target.set_release_fence(release_fence_from_display());
//! target.wait_released(Duration::from_millis(16))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod allocator;
pub mod config;
pub mod criteria;
pub mod error;
pub mod fence;
pub mod logging;
pub mod slot;

// Re-export key types for convenience.
pub use allocator::{BufferAllocator, BufferDescriptor, BufferUsage, GraphicBuffer, HeapAllocator, HeapBuffer, PixelFormat};
pub use config::{ConfigLoader, FramebufferConfig};
pub use criteria::{AllocationParams, Dimensions, DimensionsAndFormat, MatchCriteria};
pub use error::{AllocationError, ConfigError, FenceError, FramebufferError, LoggingError};
pub use fence::{ReleaseFence, SyncFileFence};
pub use slot::{FenceGatedBuffer, Framebuffer, ScalingBuffer, DEFAULT_RELEASE_WAIT_TIMEOUT};
