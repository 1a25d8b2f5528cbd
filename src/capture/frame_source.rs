//! Shared-memory frame source
//!
//! Owns the display connection and the shared-memory segment the server
//! writes captured frames into. Acquisition runs segment create, map, attach;
//! [`FrameSource::close`] releases in the exact reverse order and skips
//! whatever was never acquired.

use std::ptr::NonNull;
use std::rc::Rc;

use crate::capture::traits::{DisplayServer, SharedMemory, ShmConnection};
use crate::error::{CaptureError, CaptureResult};
use crate::types::{FrameImage, ScreenInfo};

/// Acquisition state of the shared-memory segment.
/// Each field is `Some` only while the matching step is held.
#[derive(Debug, Default)]
struct ShmBuffer {
    shmid: Option<i32>,
    addr: Option<NonNull<u8>>,
    segment: Option<u32>,
}

/// Captures the default screen's root window through shared memory
pub struct FrameSource<C: ShmConnection, M: SharedMemory> {
    connection: Option<Rc<C>>,
    memory: M,
    screen: ScreenInfo,
    buffer: ShmBuffer,
    image: Option<FrameImage>,
}

impl<C: ShmConnection, M: SharedMemory> FrameSource<C, M> {
    /// Open the display and check for shared-memory support.
    ///
    /// On `Unsupported` the connection has already been closed when this
    /// returns.
    pub fn open<D>(display: &D, memory: M, name: Option<&str>) -> CaptureResult<Self>
    where
        D: DisplayServer<Connection = C>,
    {
        let connection = display.open(name)?;
        let screen = connection.screen();
        log::debug!(
            "Opened display {}: {}x{} depth {} root 0x{:x}",
            name.unwrap_or("(default)"),
            screen.width,
            screen.height,
            screen.depth,
            screen.root
        );

        if !connection.shm_supported() {
            drop(connection);
            return Err(CaptureError::Unsupported(
                "MIT-SHM extension not available".to_string(),
            ));
        }

        Ok(Self {
            connection: Some(Rc::new(connection)),
            memory,
            screen,
            buffer: ShmBuffer::default(),
            image: None,
        })
    }

    /// Create the image descriptor and its backing segment, then attach the
    /// segment to the server. Calling it again once allocated is a no-op.
    ///
    /// A failure leaves the steps that did succeed recorded so that
    /// [`FrameSource::close`] releases them.
    pub fn allocate_buffer(&mut self) -> CaptureResult<()> {
        if self.image.is_some() {
            return Ok(());
        }
        let connection = self
            .connection
            .clone()
            .ok_or_else(|| CaptureError::ConnectionFailed("connection closed".to_string()))?;

        let image = FrameImage::for_screen(&self.screen)?;
        let size = image.size();

        let shmid = self.memory.create(size)?;
        self.buffer.shmid = Some(shmid);
        log::debug!("Created shared memory segment {} ({} bytes)", shmid, size);

        let addr = self.memory.map(shmid)?;
        self.buffer.addr = Some(addr);

        let segment = connection.shm_attach(shmid)?;
        self.buffer.segment = Some(segment);
        log::debug!("Attached segment {} as 0x{:x}", shmid, segment);

        self.image = Some(image);
        Ok(())
    }

    /// Ask the server to copy the whole root window into the segment.
    ///
    /// On failure the buffer keeps the previous frame's pixels.
    pub fn pull_frame(&mut self) -> CaptureResult<()> {
        let (Some(connection), Some(segment), Some(image)) =
            (&self.connection, self.buffer.segment, &self.image)
        else {
            return Err(CaptureError::FrameFailed(
                "shared memory buffer not attached".to_string(),
            ));
        };

        connection.shm_get_image(self.screen.root, segment, image.width, image.height)
    }

    /// Pixels of the most recent frame, `None` when no buffer is mapped
    pub fn pixels(&self) -> Option<&[u8]> {
        let addr = self.buffer.addr?;
        let image = self.image.as_ref()?;
        // SAFETY: `addr` maps a segment created with `image.size()` bytes and
        // stays mapped until `close`, which needs `&mut self`.
        Some(unsafe { std::slice::from_raw_parts(addr.as_ptr(), image.size()) })
    }

    /// Descriptor of the captured image, once the buffer is allocated
    pub fn image(&self) -> Option<&FrameImage> {
        self.image.as_ref()
    }

    pub fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    /// Shared handle to the connection, for collaborators such as the cursor
    pub fn connection(&self) -> Option<Rc<C>> {
        self.connection.clone()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Release everything in reverse acquisition order.
    ///
    /// Each step runs only if its acquisition succeeded; calling this on a
    /// closed source does nothing.
    pub fn close(&mut self) {
        if let Some(segment) = self.buffer.segment.take() {
            if let Some(connection) = &self.connection {
                connection.shm_detach(segment);
                log::debug!("Detached segment 0x{:x}", segment);
            }
        }

        if let Some(addr) = self.buffer.addr.take() {
            self.memory.unmap(addr);
        }

        if let Some(shmid) = self.buffer.shmid.take() {
            self.memory.remove(shmid);
            log::debug!("Removed shared memory segment {}", shmid);
        }

        self.image = None;

        if self.connection.take().is_some() {
            log::debug!("Closed display connection");
        }
    }
}

impl<C: ShmConnection, M: SharedMemory> Drop for FrameSource<C, M> {
    fn drop(&mut self) {
        self.close();
    }
}
