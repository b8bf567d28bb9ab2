// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Buffer allocators and the vocabulary used to describe buffers.
//!
//! The slot treats buffer memory as an opaque handle produced by a
//! [`BufferAllocator`]. Dimensions, pixel format and usage flags are baked in
//! at creation and can be read back through [`GraphicBuffer`]; releasing the
//! memory is dropping the handle.
//!
//! Two allocators ship with the crate:
//! - [`HeapAllocator`]: CPU memory, used for software composition and tests.
//! - `GbmAllocator` (feature `gbm`): GBM buffer objects on a DRM device.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;

mod heap;
pub use heap::{HeapAllocator, HeapBuffer};

#[cfg(feature = "gbm")]
mod drm_gbm;
#[cfg(feature = "gbm")]
pub use drm_gbm::{GbmAllocator, GbmBuffer};

/// Pixel formats a render target can be allocated with.
///
/// Names follow the byte order in memory, as the display HAL does
/// (`Rgba8888` is R, G, B, A in consecutive bytes).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 32-bit RGBA, 8 bits per channel. Default for composition targets.
    #[default]
    Rgba8888,
    /// 32-bit RGB with an ignored fourth byte.
    Rgbx8888,
    /// 32-bit BGRA, 8 bits per channel.
    Bgra8888,
    /// 32-bit ARGB, alpha first.
    Argb8888,
    /// 32-bit XRGB, first byte ignored.
    Xrgb8888,
    /// 16-bit RGB 5:6:5.
    Rgb565,
    /// YUV 4:2:0, a Y plane followed by an interleaved UV plane.
    Nv12,
}

impl PixelFormat {
    /// Bytes per pixel of the first plane.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888
            | PixelFormat::Rgbx8888
            | PixelFormat::Bgra8888
            | PixelFormat::Argb8888
            | PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Nv12 => 1,
        }
    }

    /// Tightly packed stride in bytes of the first plane.
    pub fn min_stride(self, width: u32) -> Option<usize> {
        (width as usize).checked_mul(self.bytes_per_pixel())
    }

    /// Total bytes of a tightly packed frame, all planes included.
    ///
    /// Returns `None` if the size does not fit in `usize`.
    pub fn frame_size(self, width: u32, height: u32) -> Option<usize> {
        let plane = self.min_stride(width)?.checked_mul(height as usize)?;
        match self {
            // Chroma plane is half the luma plane.
            PixelFormat::Nv12 => plane.checked_add(plane / 2 + plane % 2),
            _ => Some(plane),
        }
    }
}

bitflags! {
    /// How a buffer is going to be accessed.
    ///
    /// Allocators use these to pick memory placement and tiling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The CPU reads the buffer frequently.
        const SW_READ_OFTEN = 1 << 0;
        /// The CPU writes the buffer frequently.
        const SW_WRITE_OFTEN = 1 << 1;
        /// Sampled as a texture by the GPU.
        const HW_TEXTURE = 1 << 2;
        /// Rendered into by the GPU.
        const HW_RENDER = 1 << 3;
        /// Used by the hardware composer as a layer.
        const HW_COMPOSER = 1 << 4;
        /// Scanned out by the display controller.
        const HW_FB = 1 << 5;
        /// Vendor compressed (AFBC) layout for pre-composition and squash layers.
        const AFBC = 1 << 6;
    }
}

/// Everything an allocator needs to create a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Rejects descriptors no allocator can satisfy.
    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.width == 0 || self.height == 0 {
            return Err(AllocationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl fmt::Display for BufferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?} {:?}", self.width, self.height, self.format, self.usage)
    }
}

/// Introspection on an allocated buffer handle.
pub trait GraphicBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> PixelFormat;
    fn usage(&self) -> BufferUsage;
}

/// Produces buffer handles.
///
/// Handles are released by dropping them. Allocators that hand out
/// reference-counted handles free the memory once the last reference goes.
pub trait BufferAllocator {
    type Buffer: GraphicBuffer;

    /// Allocates a buffer matching `descriptor`.
    fn allocate(&self, descriptor: &BufferDescriptor) -> Result<Self::Buffer, AllocationError>;
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    type Buffer = A::Buffer;

    fn allocate(&self, descriptor: &BufferDescriptor) -> Result<Self::Buffer, AllocationError> {
        (**self).allocate(descriptor)
    }
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for Arc<A> {
    type Buffer = A::Buffer;

    fn allocate(&self, descriptor: &BufferDescriptor) -> Result<Self::Buffer, AllocationError> {
        (**self).allocate(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PixelFormat::Rgba8888, 64, 64, 64 * 64 * 4)]
    #[case(PixelFormat::Rgb565, 10, 3, 10 * 3 * 2)]
    #[case(PixelFormat::Nv12, 4, 4, 16 + 8)]
    #[case(PixelFormat::Nv12, 3, 3, 9 + 5)]
    fn test_frame_size(#[case] format: PixelFormat, #[case] w: u32, #[case] h: u32, #[case] expected: usize) {
        assert_eq!(format.frame_size(w, h), Some(expected));
    }

    #[test]
    fn test_descriptor_rejects_zero_dimensions() {
        let descriptor = BufferDescriptor {
            width: 0,
            height: 480,
            format: PixelFormat::Rgba8888,
            usage: BufferUsage::HW_RENDER,
        };
        assert!(matches!(
            descriptor.validate(),
            Err(AllocationError::InvalidDimensions { width: 0, height: 480 })
        ));
    }

    #[test]
    fn test_pixel_format_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: PixelFormat,
        }
        let parsed: Wrapper = toml::from_str("format = \"nv12\"").unwrap();
        assert_eq!(parsed.format, PixelFormat::Nv12);
        let parsed: Wrapper = toml::from_str("format = \"rgba8888\"").unwrap();
        assert_eq!(parsed.format, PixelFormat::Rgba8888);
    }
}
