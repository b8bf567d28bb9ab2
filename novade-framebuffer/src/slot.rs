// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! # Fence-gated buffer slots
//!
//! A [`FenceGatedBuffer`] owns at most one render-target buffer together with
//! the release fence of its last submission. The orchestrator allocates the
//! slot before drawing, hands the consumer's release fence to the slot after
//! submitting, and the slot decides when the memory may be reclaimed:
//!
//! - Same criteria as the current buffer: the buffer is reused at once. No
//!   fence wait happens here; write-after-read ordering on an unchanged
//!   buffer is left to the orchestrator's frame pacing.
//! - Different criteria: the slot blocks on the pending release fence for a
//!   bounded time before dropping the old buffer. If the fence does not
//!   signal the allocation is abandoned and the old buffer stays in place.
//!
//! [`Framebuffer`] is the composition target (reused on equal dimensions),
//! [`ScalingBuffer`] the scaler/rotation target (reused on equal dimensions
//! and pixel format).
//!
//! ## Ownership
//!
//! Every state-changing operation takes `&mut self`, so a slot is driven by
//! one caller at a time. Independent slots can live on different threads.
//! Code that must share a slot wraps it in its own lock.

use std::fmt;
use std::marker::PhantomData;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::allocator::{BufferAllocator, GraphicBuffer};
use crate::config::{FramebufferConfig, DEFAULT_RELEASE_WAIT_TIMEOUT_MS};
use crate::criteria::{AllocationParams, Dimensions, DimensionsAndFormat, MatchCriteria};
use crate::error::{FenceError, FramebufferError, Result};
use crate::fence::{ReleaseFence, SyncFileFence};

/// Bounded release-fence wait used on the resize path unless configured otherwise.
pub const DEFAULT_RELEASE_WAIT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_RELEASE_WAIT_TIMEOUT_MS);

/// Composition target: reused while width and height are unchanged.
pub type Framebuffer<A, F = SyncFileFence> = FenceGatedBuffer<A, Dimensions, F>;

/// Scaling/rotation target: reused while width, height and format are unchanged.
pub type ScalingBuffer<A, F = SyncFileFence> = FenceGatedBuffer<A, DimensionsAndFormat, F>;

/// The release fence can only exist next to a buffer.
enum SlotState<B, F> {
    Empty,
    Allocated { buffer: B, release_fence: Option<F> },
}

/// A single render-target slot gated by a release fence.
///
/// * `A`: allocator producing the buffer handles.
/// * `C`: reuse criteria, see [`MatchCriteria`].
/// * `F`: release fence type, closed when dropped.
pub struct FenceGatedBuffer<A: BufferAllocator, C, F = SyncFileFence> {
    allocator: A,
    params: AllocationParams,
    release_wait_timeout: Duration,
    state: SlotState<A::Buffer, F>,
    _criteria: PhantomData<fn(C)>,
}

impl<A, C, F> FenceGatedBuffer<A, C, F>
where
    A: BufferAllocator,
    C: MatchCriteria,
    F: ReleaseFence,
{
    /// Creates an empty slot.
    pub fn new(allocator: A, params: AllocationParams) -> Self {
        Self {
            allocator,
            params,
            release_wait_timeout: DEFAULT_RELEASE_WAIT_TIMEOUT,
            state: SlotState::Empty,
            _criteria: PhantomData,
        }
    }

    /// Overrides the bounded wait used by [`allocate`](Self::allocate) on the resize path.
    pub fn with_release_wait_timeout(mut self, timeout: Duration) -> Self {
        self.release_wait_timeout = timeout;
        self
    }

    /// Returns `true` if the slot holds a buffer.
    pub fn is_valid(&self) -> bool {
        matches!(self.state, SlotState::Allocated { .. })
    }

    /// The current buffer, if any.
    pub fn buffer(&self) -> Option<&A::Buffer> {
        match &self.state {
            SlotState::Allocated { buffer, .. } => Some(buffer),
            SlotState::Empty => None,
        }
    }

    /// The release fence of the last submission, if one is held.
    pub fn release_fence(&self) -> Option<&F> {
        match &self.state {
            SlotState::Allocated { release_fence, .. } => release_fence.as_ref(),
            SlotState::Empty => None,
        }
    }

    pub fn params(&self) -> &AllocationParams {
        &self.params
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn release_wait_timeout(&self) -> Duration {
        self.release_wait_timeout
    }

    /// Hands the consumer's release fence to the slot.
    ///
    /// A fence already held is closed first. The new fence is not checked in
    /// any way. An empty slot has nothing the fence could guard, so the fence
    /// is closed right away.
    pub fn set_release_fence(&mut self, fence: F) {
        match &mut self.state {
            SlotState::Allocated { release_fence, .. } => {
                if let Some(previous) = release_fence.take() {
                    trace!("Closing superseded release fence");
                    drop(previous);
                }
                *release_fence = Some(fence);
            }
            SlotState::Empty => {
                warn!("Release fence set on an empty buffer slot, closing it");
                drop(fence);
            }
        }
    }

    /// Makes sure the slot holds a buffer matching `criteria`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if a matching buffer was reused or a new one allocated.
    /// - `Err(FramebufferError::ReleaseWait)` if the criteria changed and the
    ///   release fence of the current buffer did not signal within
    ///   [`release_wait_timeout`](Self::release_wait_timeout). The slot is
    ///   unchanged: old buffer and fence are still held. The wait is not
    ///   retried.
    /// - `Err(FramebufferError::Allocation)` if the allocator failed. The slot
    ///   is empty afterwards.
    pub fn allocate(&mut self, criteria: impl Into<C>) -> Result<()> {
        let criteria = criteria.into();
        if let SlotState::Allocated { buffer, release_fence } = &self.state {
            if criteria.matches(buffer) {
                trace!(?criteria, "Reuse buffer");
                return Ok(());
            }

            if let Some(fence) = release_fence {
                if let Err(source) = fence.wait(self.release_wait_timeout) {
                    error!(?criteria, "Wait for release fence failed: {}", source);
                    return Err(FramebufferError::ReleaseWait { source });
                }
            }
            self.clear();
        }

        let descriptor = criteria.descriptor(&self.params);
        debug!("Allocate buffer {}", descriptor);
        let buffer = self.allocator.allocate(&descriptor).map_err(|e| {
            error!("Buffer allocation failed for {}: {}", descriptor, e);
            e
        })?;
        self.state = SlotState::Allocated {
            buffer,
            release_fence: None,
        };
        Ok(())
    }

    /// Drops the buffer and closes the release fence.
    ///
    /// Does not wait for the fence. If the consumer may still be reading,
    /// call [`wait_released`](Self::wait_released) first.
    pub fn clear(&mut self) {
        let SlotState::Allocated { buffer, release_fence } = std::mem::replace(&mut self.state, SlotState::Empty)
        else {
            return;
        };
        drop(release_fence);
        debug!("Free buffer {}x{}", buffer.width(), buffer.height());
        drop(buffer);
    }

    /// Blocks for up to `timeout` until the consumer has released the buffer.
    ///
    /// Succeeds immediately if the slot is empty or holds no fence. The fence
    /// stays with the slot afterwards, so waiting again is cheap.
    pub fn wait_released(&self, timeout: Duration) -> std::result::Result<(), FenceError> {
        match self.release_fence() {
            Some(fence) => fence.wait(timeout),
            None => Ok(()),
        }
    }
}

impl<A, C, F> FenceGatedBuffer<A, C, F>
where
    A: BufferAllocator,
    C: MatchCriteria,
    F: ReleaseFence + AsRawFd,
{
    /// Raw descriptor of the held release fence. The slot keeps ownership.
    pub fn release_fence_fd(&self) -> Option<RawFd> {
        self.release_fence().map(AsRawFd::as_raw_fd)
    }
}

impl<A, F> FenceGatedBuffer<A, Dimensions, F>
where
    A: BufferAllocator,
    F: ReleaseFence,
{
    /// Empty composition target with the default preset.
    pub fn composition(allocator: A) -> Self {
        Self::new(allocator, AllocationParams::composition())
    }

    /// Empty composition target configured from `config`.
    pub fn from_config(allocator: A, config: &FramebufferConfig) -> Self {
        Self::new(allocator, config.composition_params()).with_release_wait_timeout(config.fence.release_wait_timeout())
    }
}

impl<A, F> FenceGatedBuffer<A, DimensionsAndFormat, F>
where
    A: BufferAllocator,
    F: ReleaseFence,
{
    /// Empty scaling target with the default preset.
    pub fn scaling(allocator: A) -> Self {
        Self::new(allocator, AllocationParams::scaling())
    }

    /// Empty scaling target configured from `config`.
    pub fn from_config(allocator: A, config: &FramebufferConfig) -> Self {
        Self::new(allocator, config.scaling_params()).with_release_wait_timeout(config.fence.release_wait_timeout())
    }
}

impl<A, C, F> fmt::Debug for FenceGatedBuffer<A, C, F>
where
    A: BufferAllocator,
    A::Buffer: fmt::Debug,
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FenceGatedBuffer");
        match &self.state {
            SlotState::Empty => s.field("buffer", &None::<()>),
            SlotState::Allocated { buffer, release_fence } => {
                s.field("buffer", buffer).field("release_fence", release_fence)
            }
        };
        s.field("params", &self.params)
            .field("release_wait_timeout", &self.release_wait_timeout)
            .finish()
    }
}
