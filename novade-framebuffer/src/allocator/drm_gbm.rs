// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! # DRM/GBM Allocator
//!
//! Allocates render targets as GBM buffer objects on a DRM device, for
//! direct scanout through KMS.

use std::fmt;
use std::io;
use std::os::fd::AsFd;
use std::sync::Arc;

use ::gbm::{BufferObject, BufferObjectFlags, Device, Format};
use tracing::debug;

use super::{BufferAllocator, BufferDescriptor, BufferUsage, GraphicBuffer, PixelFormat};
use crate::error::AllocationError;

/// GBM-backed buffer allocator.
pub struct GbmAllocator<T: AsFd> {
    device: Arc<Device<T>>,
}

impl<T: AsFd> GbmAllocator<T> {
    /// Opens a GBM device on an already opened DRM node.
    pub fn new(drm_fd: T) -> io::Result<Self> {
        Ok(Self {
            device: Arc::new(Device::new(drm_fd)?),
        })
    }

    /// Shares a GBM device that is also used elsewhere (e.g. by EGL).
    pub fn from_device(device: Arc<Device<T>>) -> Self {
        Self { device }
    }
}

impl<T: AsFd> Clone for GbmAllocator<T> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
        }
    }
}

impl<T: AsFd> BufferAllocator for GbmAllocator<T> {
    type Buffer = GbmBuffer;

    fn allocate(&self, descriptor: &BufferDescriptor) -> Result<GbmBuffer, AllocationError> {
        descriptor.validate()?;
        let format = fourcc(descriptor.format);
        let flags = gbm_flags(descriptor.usage);
        let bo = self
            .device
            .create_buffer_object::<()>(descriptor.width, descriptor.height, format, flags)?;
        debug!("GBM buffer object created: {} ({:?})", descriptor, flags);
        Ok(GbmBuffer {
            bo: Arc::new(bo),
            descriptor: *descriptor,
        })
    }
}

/// A reference-counted GBM buffer object.
#[derive(Clone)]
pub struct GbmBuffer {
    bo: Arc<BufferObject<()>>,
    descriptor: BufferDescriptor,
}

impl GbmBuffer {
    /// The underlying buffer object, e.g. for adding a KMS framebuffer.
    pub fn buffer_object(&self) -> &BufferObject<()> {
        &self.bo
    }

    /// Returns `true` if both handles refer to the same buffer object.
    pub fn ptr_eq(&self, other: &GbmBuffer) -> bool {
        Arc::ptr_eq(&self.bo, &other.bo)
    }
}

impl GraphicBuffer for GbmBuffer {
    fn width(&self) -> u32 {
        self.descriptor.width
    }

    fn height(&self) -> u32 {
        self.descriptor.height
    }

    fn format(&self) -> PixelFormat {
        self.descriptor.format
    }

    fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }
}

impl fmt::Debug for GbmBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmBuffer").field("descriptor", &self.descriptor).finish()
    }
}

/// DRM fourcc codes name formats by little-endian word layout, so the byte
/// order in memory is reversed relative to `PixelFormat`.
fn fourcc(format: PixelFormat) -> Format {
    match format {
        PixelFormat::Rgba8888 => Format::Abgr8888,
        PixelFormat::Rgbx8888 => Format::Xbgr8888,
        PixelFormat::Bgra8888 => Format::Argb8888,
        PixelFormat::Argb8888 => Format::Bgra8888,
        PixelFormat::Xrgb8888 => Format::Bgrx8888,
        PixelFormat::Rgb565 => Format::Rgb565,
        PixelFormat::Nv12 => Format::Nv12,
    }
}

fn gbm_flags(usage: BufferUsage) -> BufferObjectFlags {
    let mut flags = BufferObjectFlags::empty();
    if usage.contains(BufferUsage::HW_FB) {
        flags |= BufferObjectFlags::SCANOUT;
    }
    if usage.intersects(BufferUsage::HW_RENDER | BufferUsage::HW_COMPOSER | BufferUsage::HW_TEXTURE) {
        flags |= BufferObjectFlags::RENDERING;
    }
    if usage.intersects(BufferUsage::SW_READ_OFTEN | BufferUsage::SW_WRITE_OFTEN) {
        flags |= BufferObjectFlags::LINEAR;
    }
    if usage.contains(BufferUsage::SW_WRITE_OFTEN) {
        flags |= BufferObjectFlags::WRITE;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_usage_maps_to_scanout_rendering() {
        let flags = gbm_flags(BufferUsage::HW_FB | BufferUsage::HW_RENDER | BufferUsage::HW_COMPOSER);
        assert!(flags.contains(BufferObjectFlags::SCANOUT | BufferObjectFlags::RENDERING));
        assert!(!flags.contains(BufferObjectFlags::LINEAR));
    }

    #[test]
    fn test_cpu_usage_maps_to_linear_write() {
        let flags = gbm_flags(BufferUsage::SW_READ_OFTEN | BufferUsage::SW_WRITE_OFTEN);
        assert!(flags.contains(BufferObjectFlags::LINEAR | BufferObjectFlags::WRITE));
        assert!(!flags.contains(BufferObjectFlags::SCANOUT));
    }

    #[test]
    fn test_rgba_memory_order_is_abgr_fourcc() {
        assert_eq!(fourcc(PixelFormat::Rgba8888), Format::Abgr8888);
        assert_eq!(fourcc(PixelFormat::Bgra8888), Format::Argb8888);
    }
}
