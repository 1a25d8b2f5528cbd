//! Boundary to the host's GPU abstraction
//!
//! Texture work must happen while the graphics context is held. The
//! [`GraphicsContext`] guard enters the context when created and leaves it
//! when dropped, and the texture bridge and cursor take a reference to the
//! guard as proof of acquisition.

pub mod software;
pub mod texture;

pub use software::{SimpleEffect, SoftwareGraphics, TextureHandle};
pub use texture::TextureBridge;

use crate::types::PixelFormat;

/// Texture usage hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureFlags(u32);

impl TextureFlags {
    pub const NONE: TextureFlags = TextureFlags(0);
    /// Contents are replaced frequently
    pub const DYNAMIC: TextureFlags = TextureFlags(1 << 0);

    pub fn contains(&self, other: TextureFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Blend factors applied to source and destination colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

/// Operations this crate needs from the host's graphics subsystem
pub trait Graphics {
    type Texture;

    /// Acquire the graphics context for the calling thread
    fn enter_context(&self);

    /// Release the graphics context acquired by [`Graphics::enter_context`]
    fn leave_context(&self);

    /// Allocate a texture, optionally seeded with tightly packed pixels.
    /// Returns `None` when the allocation fails.
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
        flags: TextureFlags,
    ) -> Option<Self::Texture>;

    /// Replace the full contents of a texture. Returns `false` on failure.
    fn set_image(&self, texture: &Self::Texture, data: &[u8], stride: usize, flip: bool) -> bool;

    fn destroy_texture(&self, texture: Self::Texture);

    /// Width and height of a texture
    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32);

    fn enable_blending(&self, enable: bool);

    fn blend_function(&self, src: BlendFactor, dst: BlendFactor);

    /// Draw a texture at full size with its top-left corner at `(x, y)`
    fn draw_sprite(&self, texture: &Self::Texture, x: i32, y: i32);
}

/// Shader parameter binding of the host's render pass
pub trait Effect<G: Graphics + ?Sized> {
    /// Bind `texture` to the named parameter. Returns `false` if the
    /// effect has no such parameter.
    fn set_texture(&mut self, param: &str, texture: &G::Texture) -> bool;
}

/// Scoped acquisition of the graphics context
#[must_use = "the context is released as soon as the guard is dropped"]
pub struct GraphicsContext<'a, G: Graphics + ?Sized> {
    graphics: &'a G,
}

impl<'a, G: Graphics + ?Sized> GraphicsContext<'a, G> {
    pub fn enter(graphics: &'a G) -> Self {
        graphics.enter_context();
        Self { graphics }
    }

    pub fn graphics(&self) -> &'a G {
        self.graphics
    }
}

impl<G: Graphics + ?Sized> Drop for GraphicsContext<'_, G> {
    fn drop(&mut self) {
        self.graphics.leave_context();
    }
}
