// Copyright (c) 2025 NovaDE Contributors
// SPDX-License-Identifier: MIT

//! Release fences.
//!
//! A release fence tells the producer when a consumer (scanout, a scaler)
//! has finished reading a buffer. The slot only needs two things from it: a
//! bounded wait, and closing it exactly once, which in Rust is simply `Drop`.

use std::fmt;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::error::FenceError;

/// A fence a consumer signals once it has stopped reading a buffer.
///
/// Implementors release the underlying kernel object when dropped. A slot
/// never calls anything like `close` explicitly; replacing or dropping the
/// fence value is the close.
pub trait ReleaseFence {
    /// Blocks for at most `timeout` until the fence is signaled.
    ///
    /// # Returns
    /// - `Ok(())` once the fence has signaled (immediately if it already had).
    /// - `Err(FenceError::TimedOut)` if `timeout` elapsed first.
    /// - Any other `FenceError` if the fence cannot be waited on.
    fn wait(&self, timeout: Duration) -> Result<(), FenceError>;

    /// Non-blocking check whether the fence has signaled.
    fn is_signaled(&self) -> bool {
        self.wait(Duration::ZERO).is_ok()
    }
}

impl<F: ReleaseFence + ?Sized> ReleaseFence for Box<F> {
    fn wait(&self, timeout: Duration) -> Result<(), FenceError> {
        (**self).wait(timeout)
    }
}

impl<F: ReleaseFence + ?Sized> ReleaseFence for Arc<F> {
    fn wait(&self, timeout: Duration) -> Result<(), FenceError> {
        (**self).wait(timeout)
    }
}

/// A kernel sync_file descriptor used as a release fence.
///
/// The fence is signaled when the descriptor polls readable. Any pollable
/// descriptor with the same readiness semantics works, which is what the
/// tests rely on when they stand a pipe in for a display driver.
pub struct SyncFileFence {
    fd: OwnedFd,
}

impl SyncFileFence {
    /// Takes ownership of a raw fence descriptor handed over by a driver.
    ///
    /// # Safety
    /// `fd` must be an open descriptor that nothing else will close.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd: OwnedFd::from_raw_fd(fd) }
    }

    /// Duplicates the descriptor, e.g. to hand the same fence to a second consumer.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self { fd: self.fd.try_clone()? })
    }

    /// Gives up the fence and returns the descriptor without closing it.
    pub fn into_owned_fd(self) -> OwnedFd {
        self.fd
    }
}

impl From<OwnedFd> for SyncFileFence {
    fn from(fd: OwnedFd) -> Self {
        Self { fd }
    }
}

impl AsFd for SyncFileFence {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for SyncFileFence {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl fmt::Debug for SyncFileFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFileFence").field("fd", &self.fd.as_raw_fd()).finish()
    }
}

impl ReleaseFence for SyncFileFence {
    fn wait(&self, timeout: Duration) -> Result<(), FenceError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, poll_timeout(remaining)?) {
                Ok(0) => return Err(FenceError::TimedOut(timeout)),
                Ok(_) => {
                    let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
                    if revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL) {
                        return Err(FenceError::InvalidDescriptor);
                    }
                    return Ok(());
                }
                // Interrupted waits resume with whatever time is left.
                Err(Errno::EINTR) | Err(Errno::EAGAIN) => continue,
                Err(errno) => return Err(FenceError::Poll(errno)),
            }
        }
    }
}

/// Converts the remaining wait time to a poll timeout.
fn poll_timeout(remaining: Duration) -> Result<PollTimeout, FenceError> {
    PollTimeout::try_from(timeout_millis(remaining)).map_err(|_| FenceError::Poll(Errno::EINVAL))
}

/// Whole milliseconds, rounded up so a sub-millisecond remainder still blocks.
fn timeout_millis(remaining: Duration) -> i32 {
    let mut millis = remaining.as_millis();
    if remaining.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    i32::try_from(millis).unwrap_or(i32::MAX)
}
