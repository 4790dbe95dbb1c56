//! Capture source abstraction
//!
//! A [`CaptureSource`] enumerates interfaces and opens them. Each open
//! interface yields a [`CaptureHandle`] that is read from one thread only.

use packetsleuth_core::{Frame, Interface, Result};

/// Something that can list and open capture interfaces
pub trait CaptureSource: Send + Sync {
    /// Enumerate the devices visible to this source
    fn list_devices(&self) -> Result<Vec<Interface>>;

    /// Open a live capture on an interface
    ///
    /// Fails with `Error::Open` when the interface cannot be captured, for
    /// example because of missing privileges.
    fn open(&self, interface: &Interface) -> Result<Box<dyn CaptureHandle>>;
}

/// An open capture session bound to one interface
pub trait CaptureHandle: Send {
    /// Wait up to one poll interval for the next frame
    ///
    /// `Ok(None)` means nothing arrived in time. An error is fatal for the
    /// handle.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying capture resource
    ///
    /// Idempotent. `next_frame` fails after this.
    fn close(&mut self);

    /// Frames dropped below the handle (kernel buffer overruns), if known
    fn kernel_drops(&mut self) -> Option<u64> {
        None
    }
}
