//! Cursor overlay drawn on top of the captured frame

#[cfg(target_os = "linux")]
mod xfixes;

#[cfg(target_os = "linux")]
pub use xfixes::XfixesCursor;

use std::rc::Rc;

use crate::error::{CaptureError, CaptureResult};
use crate::graphics::{BlendFactor, Graphics, GraphicsContext, TextureFlags};
use crate::types::PixelFormat;

/// Lifecycle the capture session drives for its cursor overlay
pub trait CursorOverlay<G: Graphics>: Sized {
    /// Display connection the overlay queries the pointer through
    type Connection;

    /// Called once during session creation, inside the graphics context
    fn init(connection: Rc<Self::Connection>, ctx: &GraphicsContext<'_, G>) -> CaptureResult<Self>;

    /// Refresh position and shape; called after every frame pull
    fn tick(&mut self, ctx: &GraphicsContext<'_, G>);

    /// Draw the pointer; called after the frame has been drawn
    fn render(&self, graphics: &G);

    /// Release GPU resources. Safe to call more than once.
    fn destroy(&mut self, ctx: &GraphicsContext<'_, G>);
}

/// A cursor image as reported by the display server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    /// Pointer position on the screen
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Hotspot inside the image
    pub xhot: u32,
    pub yhot: u32,
    /// Changes whenever the cursor shape changes
    pub serial: u32,
    /// ARGB pixels, one `u32` per pixel
    pub pixels: Vec<u32>,
}

impl CursorImage {
    /// Convert the ARGB words to BGRA bytes
    pub fn to_bgra(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &argb in &self.pixels {
            out.extend_from_slice(&[
                argb as u8,
                (argb >> 8) as u8,
                (argb >> 16) as u8,
                (argb >> 24) as u8,
            ]);
        }
        out
    }
}

/// Pointer sprite texture and position.
///
/// The texture is rebuilt only when the cursor shape changes.
pub struct CursorSprite<G: Graphics> {
    texture: Option<G::Texture>,
    serial: Option<u32>,
    size: (u32, u32),
    position: (i32, i32),
}

impl<G: Graphics> Default for CursorSprite<G> {
    fn default() -> Self {
        Self {
            texture: None,
            serial: None,
            size: (0, 0),
            position: (0, 0),
        }
    }
}

impl<G: Graphics> CursorSprite<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, ctx: &GraphicsContext<'_, G>, image: &CursorImage) -> CaptureResult<()> {
        self.position = (
            image.x - image.xhot as i32,
            image.y - image.yhot as i32,
        );

        let size = (image.width, image.height);
        if self.texture.is_some() && self.serial == Some(image.serial) && self.size == size {
            return Ok(());
        }

        self.release(ctx);
        if image.width == 0 || image.height == 0 {
            return Ok(());
        }

        let pixels = image.to_bgra();
        let texture = ctx
            .graphics()
            .create_texture(
                image.width,
                image.height,
                PixelFormat::BGRA8,
                Some(&pixels),
                TextureFlags::DYNAMIC,
            )
            .ok_or_else(|| {
                CaptureError::GpuResource(format!(
                    "failed to create {}x{} cursor texture",
                    image.width, image.height
                ))
            })?;

        log::trace!("Cursor shape {} ({}x{})", image.serial, image.width, image.height);
        self.texture = Some(texture);
        self.serial = Some(image.serial);
        self.size = size;
        Ok(())
    }

    pub fn render(&self, graphics: &G) {
        if let Some(texture) = &self.texture {
            graphics.enable_blending(true);
            graphics.blend_function(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha);
            graphics.draw_sprite(texture, self.position.0, self.position.1);
        }
    }

    pub fn destroy(&mut self, ctx: &GraphicsContext<'_, G>) {
        self.release(ctx);
    }

    /// Top-left corner of the sprite on screen
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    fn release(&mut self, ctx: &GraphicsContext<'_, G>) {
        if let Some(texture) = self.texture.take() {
            ctx.graphics().destroy_texture(texture);
        }
        self.serial = None;
        self.size = (0, 0);
    }
}
