//! GPU texture holding the captured screen

use crate::error::{CaptureError, CaptureResult};
use crate::graphics::{Graphics, GraphicsContext, TextureFlags};
use crate::types::PixelFormat;

/// Owns the screen-sized dynamic texture the frame source is uploaded into
pub struct TextureBridge<G: Graphics> {
    texture: Option<G::Texture>,
    width: u32,
    height: u32,
}

impl<G: Graphics> TextureBridge<G> {
    /// A bridge with no texture yet
    pub fn empty() -> Self {
        Self {
            texture: None,
            width: 0,
            height: 0,
        }
    }

    /// Allocate the texture and seed it with `pixels` (rows `stride` bytes apart)
    pub fn create(
        ctx: &GraphicsContext<'_, G>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
        stride: usize,
    ) -> CaptureResult<Self> {
        let gfx = ctx.graphics();
        let tight = stride == width as usize * format.bytes_per_pixel();
        let seed = if tight { Some(pixels) } else { None };

        let texture = gfx
            .create_texture(width, height, format, seed, TextureFlags::DYNAMIC)
            .ok_or_else(|| {
                CaptureError::GpuResource(format!(
                    "failed to create {}x{} {} texture",
                    width, height, format
                ))
            })?;

        if !tight && !gfx.set_image(&texture, pixels, stride, false) {
            gfx.destroy_texture(texture);
            return Err(CaptureError::GpuResource(
                "failed to upload initial frame".to_string(),
            ));
        }

        let (width, height) = gfx.texture_size(&texture);
        log::debug!("Created {}x{} {} source texture", width, height, format);

        Ok(Self {
            texture: Some(texture),
            width,
            height,
        })
    }

    /// Replace the whole texture with `pixels`
    pub fn update(
        &mut self,
        ctx: &GraphicsContext<'_, G>,
        pixels: &[u8],
        stride: usize,
    ) -> CaptureResult<()> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| CaptureError::GpuResource("texture not created".to_string()))?;

        if ctx.graphics().set_image(texture, pixels, stride, false) {
            Ok(())
        } else {
            Err(CaptureError::GpuResource("texture upload failed".to_string()))
        }
    }

    pub fn destroy(&mut self, ctx: &GraphicsContext<'_, G>) {
        if let Some(texture) = self.texture.take() {
            ctx.graphics().destroy_texture(texture);
            log::debug!("Destroyed source texture");
        }
        self.width = 0;
        self.height = 0;
    }

    /// Width and height of the texture, `(0, 0)` when there is none
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texture(&self) -> Option<&G::Texture> {
        self.texture.as_ref()
    }
}

impl<G: Graphics> Drop for TextureBridge<G> {
    fn drop(&mut self) {
        if self.texture.is_some() {
            log::error!("Source texture dropped without being destroyed");
        }
    }
}
