// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Reuse criteria and allocation presets for buffer slots.
//!
//! A slot keeps its buffer across frames for as long as the requested
//! criteria match the buffer it holds. The composition target compares
//! dimensions only and always allocates in its configured format; the
//! scaling target also compares the pixel format, since the scaler writes
//! whatever format the layer it processes needs.

use crate::allocator::{BufferDescriptor, BufferUsage, GraphicBuffer, PixelFormat};

/// The key a slot compares against its current buffer to decide on reuse.
pub trait MatchCriteria: Copy + std::fmt::Debug {
    /// Returns `true` if `buffer` can be reused for this request.
    fn matches<B: GraphicBuffer>(&self, buffer: &B) -> bool;

    /// Builds the allocation request for a new buffer.
    fn descriptor(&self, params: &AllocationParams) -> BufferDescriptor;
}

/// Reuse key of the composition target: width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl MatchCriteria for Dimensions {
    fn matches<B: GraphicBuffer>(&self, buffer: &B) -> bool {
        buffer.width() == self.width && buffer.height() == self.height
    }

    fn descriptor(&self, params: &AllocationParams) -> BufferDescriptor {
        BufferDescriptor {
            width: self.width,
            height: self.height,
            format: params.format,
            usage: params.usage,
        }
    }
}

/// Reuse key of the scaling target: width, height and pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionsAndFormat {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl DimensionsAndFormat {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self { width, height, format }
    }
}

impl From<(u32, u32, PixelFormat)> for DimensionsAndFormat {
    fn from((width, height, format): (u32, u32, PixelFormat)) -> Self {
        Self { width, height, format }
    }
}

impl MatchCriteria for DimensionsAndFormat {
    fn matches<B: GraphicBuffer>(&self, buffer: &B) -> bool {
        buffer.width() == self.width && buffer.height() == self.height && buffer.format() == self.format
    }

    /// The requested format wins over `params.format`.
    fn descriptor(&self, params: &AllocationParams) -> BufferDescriptor {
        BufferDescriptor {
            width: self.width,
            height: self.height,
            format: self.format,
            usage: params.usage,
        }
    }
}

/// Fixed allocation parameters of a slot: everything that is not part of
/// the reuse key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationParams {
    /// Format used when the criteria do not carry one.
    pub format: PixelFormat,
    pub usage: BufferUsage,
}

impl AllocationParams {
    /// Composition target: RGBA, rendered by the GPU, composed and scanned out.
    pub fn composition() -> Self {
        Self {
            format: PixelFormat::Rgba8888,
            usage: BufferUsage::HW_FB | BufferUsage::HW_RENDER | BufferUsage::HW_COMPOSER,
        }
    }

    /// Scaling/rotation target: CPU-visible memory the scaling engine reads and writes.
    pub fn scaling() -> Self {
        Self {
            format: PixelFormat::Rgba8888,
            usage: BufferUsage::SW_READ_OFTEN | BufferUsage::SW_WRITE_OFTEN,
        }
    }

    /// Requests the compressed (AFBC) layout, or drops the request.
    pub fn with_afbc(mut self, enabled: bool) -> Self {
        self.usage.set(BufferUsage::AFBC, enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{BufferAllocator, HeapAllocator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dimensions_ignore_format() {
        let allocator = HeapAllocator::new();
        let buffer = allocator
            .allocate(&DimensionsAndFormat::new(32, 16, PixelFormat::Nv12).descriptor(&AllocationParams::scaling()))
            .unwrap();
        assert!(Dimensions::new(32, 16).matches(&buffer));
        assert!(!Dimensions::new(16, 32).matches(&buffer));
    }

    #[test]
    fn test_dimensions_and_format_compare_format() {
        let allocator = HeapAllocator::new();
        let criteria = DimensionsAndFormat::from((32, 16, PixelFormat::Nv12));
        let buffer = allocator.allocate(&criteria.descriptor(&AllocationParams::scaling())).unwrap();
        assert!(criteria.matches(&buffer));
        assert!(!DimensionsAndFormat::new(32, 16, PixelFormat::Rgba8888).matches(&buffer));
    }

    #[test]
    fn test_composition_descriptor_uses_params_format() {
        let descriptor = Dimensions::from((1920, 1080)).descriptor(&AllocationParams::composition());
        assert_eq!(
            descriptor,
            BufferDescriptor {
                width: 1920,
                height: 1080,
                format: PixelFormat::Rgba8888,
                usage: BufferUsage::HW_FB | BufferUsage::HW_RENDER | BufferUsage::HW_COMPOSER,
            }
        );
    }

    #[test]
    fn test_with_afbc_toggles_usage_bit() {
        let params = AllocationParams::composition().with_afbc(true);
        assert!(params.usage.contains(BufferUsage::AFBC));
        assert_eq!(params.with_afbc(false), AllocationParams::composition());
    }
}
