//! X11 Shared-Memory Screen Source
//!
//! A live screen capture source for plugin hosts. Frames of the default X
//! screen are pulled through the MIT-SHM extension into a shared-memory
//! segment, uploaded into a dynamic GPU texture every tick and drawn with a
//! cursor overlay on every render.
//!
//! # Example
//!
//! ```no_run
//! use xshm_source::{SimpleEffect, SoftwareGraphics, SourceSettings, XshmInput};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graphics = SoftwareGraphics::new(1920, 1080);
//! let mut source = XshmInput::create(
//!     &Default::default(),
//!     Default::default(),
//!     graphics.clone(),
//!     SourceSettings::default(),
//! )?;
//!
//! source.tick(1.0 / 60.0);
//! source.render(&mut SimpleEffect::new());
//! println!("{}x{}", source.width(), source.height());
//!
//! source.destroy();
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod capture;
pub mod cursor;
pub mod error;
pub mod graphics;
pub mod plugin;
pub mod session;
pub mod types;

// Re-export main types
pub use capture::{DisplayServer, FrameSource, SharedMemory, ShmConnection};
pub use cursor::{CursorImage, CursorOverlay, CursorSprite};
pub use error::{CaptureError, CaptureResult};
pub use graphics::{
    BlendFactor, Effect, Graphics, GraphicsContext, SimpleEffect, SoftwareGraphics,
    TextureBridge, TextureFlags, TextureHandle,
};
pub use plugin::{OutputFlags, SourceInfo, SourceType, VideoSource, XSHM_INPUT};
pub use session::{CaptureSession, SessionState};
pub use types::{FrameImage, PixelFormat, ScreenInfo, SourceSettings, TickStats};

#[cfg(target_os = "linux")]
pub use capture::linux::{SysvShm, X11Connection, X11Display};
#[cfg(target_os = "linux")]
pub use cursor::XfixesCursor;
#[cfg(target_os = "linux")]
pub use plugin::XshmInput;

/// Library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
