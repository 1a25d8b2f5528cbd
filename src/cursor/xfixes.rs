//! Cursor overlay fed by XFixes cursor images

use std::rc::Rc;

use x11rb::protocol::xfixes;

use crate::{
    capture::linux::X11Connection,
    cursor::{CursorImage, CursorOverlay, CursorSprite},
    error::{CaptureError, CaptureResult},
    graphics::{Graphics, GraphicsContext},
};

/// Lowest XFixes version providing GetCursorImage
const XFIXES_MIN_MAJOR: u32 = 2;

/// Tracks the X pointer with XFixes and draws it as a sprite
pub struct XfixesCursor<G: Graphics> {
    connection: Rc<X11Connection>,
    sprite: CursorSprite<G>,
}

impl<G: Graphics> XfixesCursor<G> {
    fn query_image(&self) -> CaptureResult<CursorImage> {
        let reply = xfixes::get_cursor_image(self.connection.inner())
            .map_err(|e| CaptureError::CursorFailed(format!("GetCursorImage error: {}", e)))?
            .reply()
            .map_err(|e| CaptureError::CursorFailed(format!("GetCursorImage reply error: {}", e)))?;

        Ok(CursorImage {
            x: reply.x as i32,
            y: reply.y as i32,
            width: reply.width as u32,
            height: reply.height as u32,
            xhot: reply.xhot as u32,
            yhot: reply.yhot as u32,
            serial: reply.cursor_serial,
            pixels: reply.cursor_image,
        })
    }
}

impl<G: Graphics> CursorOverlay<G> for XfixesCursor<G> {
    type Connection = X11Connection;

    fn init(connection: Rc<X11Connection>, _ctx: &GraphicsContext<'_, G>) -> CaptureResult<Self> {
        let version = xfixes::query_version(connection.inner(), 4, 0)
            .map_err(|e| CaptureError::CursorFailed(format!("XFixes not available: {}", e)))?
            .reply()
            .map_err(|e| CaptureError::CursorFailed(format!("XFixes query failed: {}", e)))?;

        if version.major_version < XFIXES_MIN_MAJOR {
            return Err(CaptureError::CursorFailed(format!(
                "XFixes {}.{} lacks cursor images",
                version.major_version, version.minor_version
            )));
        }
        log::debug!("XFixes {}.{}", version.major_version, version.minor_version);

        Ok(Self {
            connection,
            sprite: CursorSprite::new(),
        })
    }

    fn tick(&mut self, ctx: &GraphicsContext<'_, G>) {
        let result = self
            .query_image()
            .and_then(|image| self.sprite.update(ctx, &image));

        if let Err(e) = result {
            log::debug!("Cursor update skipped: {}", e);
        }
    }

    fn render(&self, graphics: &G) {
        self.sprite.render(graphics);
    }

    fn destroy(&mut self, ctx: &GraphicsContext<'_, G>) {
        self.sprite.destroy(ctx);
    }
}
