// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! CPU-memory buffer allocator.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::{BufferAllocator, BufferDescriptor, BufferUsage, GraphicBuffer, PixelFormat};
use crate::error::AllocationError;

/// Allocates pixel buffers in process memory.
///
/// Cloning the allocator shares its accounting: all clones draw from the
/// same optional byte budget.
#[derive(Clone, Default)]
pub struct HeapAllocator {
    accounting: Arc<Accounting>,
}

#[derive(Default)]
struct Accounting {
    /// `None` means unlimited.
    limit: Option<usize>,
    allocated_bytes: AtomicUsize,
    live_buffers: AtomicUsize,
}

impl HeapAllocator {
    /// Creates an allocator without a memory budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that refuses to hold more than `limit` bytes at once.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            accounting: Arc::new(Accounting {
                limit: Some(limit),
                ..Accounting::default()
            }),
        }
    }

    /// Bytes held by buffers that are still alive.
    pub fn allocated_bytes(&self) -> usize {
        self.accounting.allocated_bytes.load(Ordering::Acquire)
    }

    /// Number of buffers that are still alive.
    pub fn live_buffers(&self) -> usize {
        self.accounting.live_buffers.load(Ordering::Acquire)
    }

    fn reserve(&self, requested: usize) -> Result<(), AllocationError> {
        let accounting = &self.accounting;
        let limit = accounting.limit;
        accounting
            .allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let total = used.checked_add(requested)?;
                match limit {
                    Some(limit) if total > limit => None,
                    _ => Some(total),
                }
            })
            .map_err(|used| AllocationError::OutOfMemory {
                requested,
                available: limit.map_or(0, |limit| limit.saturating_sub(used)),
            })?;
        accounting.live_buffers.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl fmt::Debug for HeapAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("limit", &self.accounting.limit)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("live_buffers", &self.live_buffers())
            .finish()
    }
}

impl BufferAllocator for HeapAllocator {
    type Buffer = HeapBuffer;

    fn allocate(&self, descriptor: &BufferDescriptor) -> Result<HeapBuffer, AllocationError> {
        descriptor.validate()?;
        let size = descriptor
            .format
            .frame_size(descriptor.width, descriptor.height)
            .ok_or(AllocationError::OutOfMemory {
                requested: usize::MAX,
                available: 0,
            })?;
        let stride = descriptor.format.min_stride(descriptor.width).unwrap_or(0);

        self.reserve(size)?;
        let buffer = HeapBuffer {
            inner: Arc::new(HeapBufferInner {
                id: next_buffer_id(),
                descriptor: *descriptor,
                stride,
                size,
                pixels: Mutex::new(vec![0; size]),
                accounting: Arc::clone(&self.accounting),
            }),
        };
        trace!(id = buffer.id(), size, "Heap buffer allocated: {}", descriptor);
        Ok(buffer)
    }
}

fn next_buffer_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A reference-counted handle to a heap-backed pixel buffer.
///
/// Clones refer to the same memory. The memory is returned to the allocator
/// when the last clone is dropped.
#[derive(Clone)]
pub struct HeapBuffer {
    inner: Arc<HeapBufferInner>,
}

struct HeapBufferInner {
    id: u64,
    descriptor: BufferDescriptor,
    stride: usize,
    size: usize,
    pixels: Mutex<Vec<u8>>,
    accounting: Arc<Accounting>,
}

impl HeapBuffer {
    /// Process-unique identifier of the underlying memory.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Row pitch of the first plane in bytes.
    pub fn stride(&self) -> usize {
        self.inner.stride
    }

    /// Returns `true` if both handles refer to the same memory.
    pub fn ptr_eq(&self, other: &HeapBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this memory.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Locks the pixel memory for CPU access.
    pub fn pixels(&self) -> MutexGuard<'_, Vec<u8>> {
        // A writer that panicked leaves the pixels in some state, never an invalid one.
        self.inner.pixels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GraphicBuffer for HeapBuffer {
    fn width(&self) -> u32 {
        self.inner.descriptor.width
    }

    fn height(&self) -> u32 {
        self.inner.descriptor.height
    }

    fn format(&self) -> PixelFormat {
        self.inner.descriptor.format
    }

    fn usage(&self) -> BufferUsage {
        self.inner.descriptor.usage
    }
}

impl fmt::Debug for HeapBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBuffer")
            .field("id", &self.inner.id)
            .field("descriptor", &self.inner.descriptor)
            .field("stride", &self.inner.stride)
            .finish()
    }
}

impl Drop for HeapBufferInner {
    fn drop(&mut self) {
        self.accounting.allocated_bytes.fetch_sub(self.size, Ordering::AcqRel);
        self.accounting.live_buffers.fetch_sub(1, Ordering::AcqRel);
        trace!(id = self.id, size = self.size, "Heap buffer freed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: u32, height: u32) -> BufferDescriptor {
        BufferDescriptor {
            width,
            height,
            format: PixelFormat::Rgba8888,
            usage: BufferUsage::SW_READ_OFTEN | BufferUsage::SW_WRITE_OFTEN,
        }
    }

    #[test]
    fn test_allocate_reports_descriptor() {
        let allocator = HeapAllocator::new();
        let buffer = allocator.allocate(&descriptor(64, 32)).unwrap();
        assert_eq!(buffer.width(), 64);
        assert_eq!(buffer.height(), 32);
        assert_eq!(buffer.format(), PixelFormat::Rgba8888);
        assert_eq!(buffer.stride(), 256);
        assert_eq!(buffer.pixels().len(), 64 * 32 * 4);
        assert_eq!(allocator.allocated_bytes(), 64 * 32 * 4);
        assert_eq!(allocator.live_buffers(), 1);
    }

    #[test]
    fn test_memory_returned_when_last_handle_drops() {
        let allocator = HeapAllocator::new();
        let buffer = allocator.allocate(&descriptor(8, 8)).unwrap();
        let extra = buffer.clone();
        assert!(buffer.ptr_eq(&extra));
        assert_eq!(buffer.ref_count(), 2);

        drop(buffer);
        assert_eq!(allocator.live_buffers(), 1);
        drop(extra);
        assert_eq!(allocator.live_buffers(), 0);
        assert_eq!(allocator.allocated_bytes(), 0);
    }

    #[test]
    fn test_budget_exhaustion() {
        let allocator = HeapAllocator::with_limit(64 * 64 * 4);
        let first = allocator.allocate(&descriptor(64, 64)).unwrap();
        match allocator.allocate(&descriptor(1, 1)) {
            Err(AllocationError::OutOfMemory { requested, available }) => {
                assert_eq!(requested, 4);
                assert_eq!(available, 0);
            }
            other => panic!("expected OutOfMemory, got {:?}", other),
        }
        drop(first);
        allocator.allocate(&descriptor(64, 64)).unwrap();
    }

    #[test]
    fn test_zero_sized_request_rejected() {
        let allocator = HeapAllocator::new();
        assert!(matches!(
            allocator.allocate(&descriptor(0, 0)),
            Err(AllocationError::InvalidDimensions { .. })
        ));
        assert_eq!(allocator.live_buffers(), 0);
    }

    #[test]
    fn test_buffer_ids_are_unique() {
        let allocator = HeapAllocator::new();
        let a = allocator.allocate(&descriptor(2, 2)).unwrap();
        let b = allocator.allocate(&descriptor(2, 2)).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(!a.ptr_eq(&b));
    }
}
