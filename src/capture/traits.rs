//! Traits for the display-server protocol and OS shared memory

use std::ptr::NonNull;

use crate::error::CaptureResult;
use crate::types::ScreenInfo;

/// Factory for display-server connections
pub trait DisplayServer {
    type Connection: ShmConnection;

    /// Open a connection to the named display (`None` for the default)
    fn open(&self, display: Option<&str>) -> CaptureResult<Self::Connection>;
}

/// A display-server connection able to transfer images through shared memory.
///
/// Dropping the connection closes it.
pub trait ShmConnection {
    /// Geometry of the default screen
    fn screen(&self) -> ScreenInfo;

    /// Check whether the shared-memory capture extension is available
    fn shm_supported(&self) -> bool;

    /// Attach an OS segment to the server, returning the server-side id
    fn shm_attach(&self, shmid: i32) -> CaptureResult<u32>;

    /// Detach a previously attached segment; never fails observably
    fn shm_detach(&self, segment: u32);

    /// Copy the full `width` x `height` contents of `drawable` into the
    /// attached segment. Blocks until the server has written the pixels.
    fn shm_get_image(&self, drawable: u32, segment: u32, width: u32, height: u32)
        -> CaptureResult<()>;
}

/// OS shared-memory segments
pub trait SharedMemory {
    /// Create an owner-only segment of `size` bytes
    fn create(&self, size: usize) -> CaptureResult<i32>;

    /// Map the segment into this process
    fn map(&self, shmid: i32) -> CaptureResult<NonNull<u8>>;

    /// Unmap a mapping returned by [`SharedMemory::map`]; never fails observably
    fn unmap(&self, addr: NonNull<u8>);

    /// Mark the segment for removal; never fails observably
    fn remove(&self, shmid: i32);
}
