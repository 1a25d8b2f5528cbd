//! Core types shared by the frame source, texture bridge and session

use std::fmt;
use std::time::Duration;

use crate::error::{CaptureError, CaptureResult};

/// Pixel format of captured frames and source textures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, Green, Red, Alpha (8 bits per channel)
    BGRA8,
}

impl PixelFormat {
    /// Get the number of bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::BGRA8 => 4,
        }
    }

    /// Get the number of bits per pixel
    pub fn bits_per_pixel(&self) -> u8 {
        (self.bytes_per_pixel() * 8) as u8
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::BGRA8 => write!(f, "BGRA8"),
        }
    }
}

/// Geometry of the default screen, read once when the display is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Root window of the screen (the capture target)
    pub root: u32,
    /// Depth of the root window in bits
    pub depth: u8,
    /// Bits per pixel of the Z-pixmap format matching `depth`
    pub bits_per_pixel: u8,
    /// Scanline padding of that format in bits
    pub scanline_pad: u8,
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            root: 0,
            depth: 24,
            bits_per_pixel: 32,
            scanline_pad: 32,
        }
    }
}

/// Descriptor of the image held in the shared-memory segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameImage {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Bytes per row, including scanline padding
    pub stride: usize,
    /// Pixel format
    pub format: PixelFormat,
}

impl FrameImage {
    /// Build the descriptor for a full-screen Z-pixmap image.
    ///
    /// Only 32 bits-per-pixel layouts are accepted; depth 24 screens store
    /// their pixels as BGRX in that layout.
    pub fn for_screen(screen: &ScreenInfo) -> CaptureResult<Self> {
        let format = PixelFormat::BGRA8;
        if screen.bits_per_pixel != format.bits_per_pixel() {
            return Err(CaptureError::Unsupported(format!(
                "{} bits per pixel (depth {})",
                screen.bits_per_pixel, screen.depth
            )));
        }
        if screen.width == 0 || screen.height == 0 {
            return Err(CaptureError::Unsupported(format!(
                "empty screen {}x{}",
                screen.width, screen.height
            )));
        }

        let pad = screen.scanline_pad.max(8) as usize;
        let row_bits = screen.width as usize * screen.bits_per_pixel as usize;
        let stride = row_bits.div_ceil(pad) * pad / 8;

        Ok(Self {
            width: screen.width,
            height: screen.height,
            stride,
            format,
        })
    }

    /// Get the number of bytes the image occupies
    pub fn size(&self) -> usize {
        self.stride * self.height as usize
    }
}

/// Settings handed to the source on creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// X display name, `None` uses `$DISPLAY`
    pub display: Option<String>,
    /// Draw the cursor on top of the captured frame
    pub show_cursor: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            display: None,
            show_cursor: true,
        }
    }
}

impl SourceSettings {
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_cursor(mut self, show_cursor: bool) -> Self {
        self.show_cursor = show_cursor;
        self
    }
}

/// Per-session frame pull statistics
#[derive(Debug, Clone, Default)]
pub struct TickStats {
    pub frames_pulled: u64,
    pub pull_failures: u64,
    /// Failures since the last successful pull
    pub failure_streak: u64,
    pub total_pull_time: Duration,
    /// Texture uploads rejected by the graphics layer
    pub upload_failures: u64,
    /// Upload failures since the last successful upload
    pub upload_failure_streak: u64,
}

impl TickStats {
    /// Get pull success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.frames_pulled + self.pull_failures;
        if total == 0 {
            0.0
        } else {
            (self.frames_pulled as f64 / total as f64) * 100.0
        }
    }

    /// Get average time of a successful pull
    pub fn average_pull_time(&self) -> Duration {
        if self.frames_pulled == 0 {
            Duration::ZERO
        } else {
            match u32::try_from(self.frames_pulled) {
                Ok(frames) => self.total_pull_time / frames,
                Err(_) => Duration::from_secs_f64(
                    self.total_pull_time.as_secs_f64() / self.frames_pulled as f64,
                ),
            }
        }
    }
}
