//! X11 display connection with MIT-SHM image transfer

use crate::{
    capture::traits::{DisplayServer, ShmConnection},
    error::{CaptureError, CaptureResult},
    types::ScreenInfo,
};

use x11rb::{
    connection::{Connection, RequestConnection},
    protocol::{
        shm,
        xproto::{self, ImageFormat},
    },
    rust_connection::RustConnection,
};

/// Opens connections to the X server named by `$DISPLAY` or explicitly
#[derive(Debug, Clone, Copy, Default)]
pub struct X11Display;

impl DisplayServer for X11Display {
    type Connection = X11Connection;

    fn open(&self, display: Option<&str>) -> CaptureResult<X11Connection> {
        X11Connection::connect(display)
    }
}

/// An open X11 connection bound to its default screen
pub struct X11Connection {
    connection: RustConnection,
    screen_num: usize,
}

impl X11Connection {
    /// Connect to the X server
    pub fn connect(display: Option<&str>) -> CaptureResult<Self> {
        let (connection, screen_num) = RustConnection::connect(display).map_err(|e| {
            CaptureError::ConnectionFailed(format!(
                "{}: {}",
                display.unwrap_or("$DISPLAY"),
                e
            ))
        })?;

        Ok(Self {
            connection,
            screen_num,
        })
    }

    /// The underlying x11rb connection
    pub fn inner(&self) -> &RustConnection {
        &self.connection
    }

    fn default_screen(&self) -> &xproto::Screen {
        &self.connection.setup().roots[self.screen_num]
    }
}

/// Image sizes travel as 16-bit fields in the X protocol
fn protocol_size(width: u32, height: u32) -> CaptureResult<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(CaptureError::FrameFailed(format!(
            "image {}x{} exceeds protocol limits",
            width, height
        ))),
    }
}

impl ShmConnection for X11Connection {
    fn screen(&self) -> ScreenInfo {
        let setup = self.connection.setup();
        let screen = self.default_screen();

        // Z-pixmap layout for the root depth
        let format = setup
            .pixmap_formats
            .iter()
            .find(|f| f.depth == screen.root_depth);

        ScreenInfo {
            width: screen.width_in_pixels as u32,
            height: screen.height_in_pixels as u32,
            root: screen.root,
            depth: screen.root_depth,
            bits_per_pixel: format.map(|f| f.bits_per_pixel).unwrap_or(0),
            scanline_pad: format.map(|f| f.scanline_pad).unwrap_or(setup.bitmap_format_scanline_pad),
        }
    }

    fn shm_supported(&self) -> bool {
        match self.connection.extension_information(shm::X11_EXTENSION_NAME) {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Extension query failed: {}", e);
                return false;
            }
        }

        match shm::query_version(&self.connection).map(|cookie| cookie.reply()) {
            Ok(Ok(version)) => {
                log::debug!(
                    "MIT-SHM {}.{} (shared pixmaps: {})",
                    version.major_version,
                    version.minor_version,
                    version.shared_pixmaps
                );
                true
            }
            Ok(Err(e)) => {
                log::warn!("MIT-SHM version query failed: {}", e);
                false
            }
            Err(e) => {
                log::warn!("MIT-SHM version request failed: {}", e);
                false
            }
        }
    }

    fn shm_attach(&self, shmid: i32) -> CaptureResult<u32> {
        let segment = self.connection.generate_id().map_err(|e| {
            CaptureError::AttachFailed(format!("Failed to generate X11 ID: {}", e))
        })?;

        shm::attach(&self.connection, segment, shmid as u32, false)
            .map_err(|e| CaptureError::AttachFailed(format!("SHM attach error: {}", e)))?
            .check()
            .map_err(|e| CaptureError::AttachFailed(format!("SHM attach rejected: {}", e)))?;

        Ok(segment)
    }

    fn shm_detach(&self, segment: u32) {
        let result = shm::detach(&self.connection, segment).map(|cookie| cookie.check());
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("SHM detach of 0x{:x} rejected: {}", segment, e),
            Err(e) => log::warn!("SHM detach of 0x{:x} failed: {}", segment, e),
        }
    }

    fn shm_get_image(
        &self,
        drawable: u32,
        segment: u32,
        width: u32,
        height: u32,
    ) -> CaptureResult<()> {
        let (width, height) = protocol_size(width, height)?;

        shm::get_image(
            &self.connection,
            drawable,
            0,  // x
            0,  // y
            width,
            height,
            !0, // All planes
            ImageFormat::Z_PIXMAP.into(),
            segment,
            0,  // offset
        )
        .map_err(|e| CaptureError::FrameFailed(format!("SHM GetImage error: {}", e)))?
        .reply()
        .map_err(|e| CaptureError::FrameFailed(format!("SHM GetImage reply error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_size_limits() {
        assert_eq!(protocol_size(3840, 2160).unwrap(), (3840, 2160));
        assert_eq!(protocol_size(65535, 1).unwrap(), (65535, 1));

        let err = protocol_size(65536, 1080).unwrap_err();
        assert!(matches!(err, CaptureError::FrameFailed(_)));
        assert!(protocol_size(1920, 70000).is_err());
    }
}
