//! CPU implementation of the graphics boundary
//!
//! Textures are plain BGRA byte buffers and sprites are composited into an
//! in-memory framebuffer. Headless hosts can use it directly; it also keeps
//! the accounting (live textures, context depth, texture calls made outside
//! the context) that tests assert on.

use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::graphics::{BlendFactor, Effect, Graphics, TextureFlags};
use crate::types::PixelFormat;

/// Handle to a texture owned by [`SoftwareGraphics`]
#[derive(Debug, PartialEq, Eq)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct SoftTexture {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

struct State {
    textures: HashMap<u64, SoftTexture>,
    next_id: u64,
    budget: Option<usize>,
    used: usize,
    blending: bool,
    blend: (BlendFactor, BlendFactor),
    framebuffer: Vec<u8>,
    fb_width: u32,
    fb_height: u32,
    draw_calls: u64,
    device_lost: bool,
}

struct Inner {
    context: ReentrantMutex<()>,
    depth: AtomicUsize,
    enters: AtomicU64,
    violations: AtomicU64,
    state: Mutex<State>,
}

/// Software renderer with a BGRA framebuffer
#[derive(Clone)]
pub struct SoftwareGraphics {
    inner: Arc<Inner>,
}

impl SoftwareGraphics {
    /// Create a renderer drawing into a `width` x `height` framebuffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                context: ReentrantMutex::new(()),
                depth: AtomicUsize::new(0),
                enters: AtomicU64::new(0),
                violations: AtomicU64::new(0),
                state: Mutex::new(State {
                    textures: HashMap::new(),
                    next_id: 1,
                    budget: None,
                    used: 0,
                    blending: true,
                    blend: (BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha),
                    framebuffer: vec![0; width as usize * height as usize * 4],
                    fb_width: width,
                    fb_height: height,
                    draw_calls: 0,
                    device_lost: false,
                }),
            }),
        }
    }

    /// Limit the bytes all live textures may occupy; allocations beyond it fail
    pub fn with_texture_budget(self, bytes: usize) -> Self {
        self.inner.state.lock().budget = Some(bytes);
        self
    }

    pub fn live_textures(&self) -> usize {
        self.inner.state.lock().textures.len()
    }

    /// Bytes held by live textures
    pub fn texture_memory(&self) -> usize {
        self.inner.state.lock().used
    }

    /// Current nesting depth of the graphics context
    pub fn context_depth(&self) -> usize {
        self.inner.depth.load(Ordering::Acquire)
    }

    /// Number of times the context has been entered
    pub fn context_enters(&self) -> u64 {
        self.inner.enters.load(Ordering::Relaxed)
    }

    /// Texture calls made while the context was not held
    pub fn context_violations(&self) -> u64 {
        self.inner.violations.load(Ordering::Relaxed)
    }

    pub fn blending_enabled(&self) -> bool {
        self.inner.state.lock().blending
    }

    pub fn draw_calls(&self) -> u64 {
        self.inner.state.lock().draw_calls
    }

    /// Copy of a texture's tightly packed pixels
    pub fn texture_pixels(&self, texture: &TextureHandle) -> Option<Vec<u8>> {
        let state = self.inner.state.lock();
        state.textures.get(&texture.0).map(|t| t.data.clone())
    }

    /// Copy of the framebuffer
    pub fn framebuffer(&self) -> Vec<u8> {
        self.inner.state.lock().framebuffer.clone()
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        let state = self.inner.state.lock();
        (state.fb_width, state.fb_height)
    }

    /// Framebuffer pixel at `(x, y)` as BGRA
    pub fn framebuffer_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let state = self.inner.state.lock();
        if x >= state.fb_width || y >= state.fb_height {
            return None;
        }
        let offset = (y as usize * state.fb_width as usize + x as usize) * 4;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&state.framebuffer[offset..offset + 4]);
        Some(pixel)
    }

    pub fn clear_framebuffer(&self) {
        self.inner.state.lock().framebuffer.fill(0);
    }

    /// Make every texture allocation and upload fail, like a lost GPU device
    pub fn set_device_lost(&self, lost: bool) {
        self.inner.state.lock().device_lost = lost;
    }

    fn check_context(&self, operation: &str) {
        if !self.inner.context.is_owned_by_current_thread() {
            self.inner.violations.fetch_add(1, Ordering::Relaxed);
            log::error!("{} called outside the graphics context", operation);
        }
    }
}

fn factor(f: BlendFactor, alpha: u32) -> u32 {
    match f {
        BlendFactor::Zero => 0,
        BlendFactor::One => 255,
        BlendFactor::SrcAlpha => alpha,
        BlendFactor::InvSrcAlpha => 255 - alpha,
    }
}

impl Graphics for SoftwareGraphics {
    type Texture = TextureHandle;

    fn enter_context(&self) {
        // The guard is released in `leave_context`
        std::mem::forget(self.inner.context.lock());
        self.inner.depth.fetch_add(1, Ordering::AcqRel);
        self.inner.enters.fetch_add(1, Ordering::Relaxed);
    }

    fn leave_context(&self) {
        if !self.inner.context.is_owned_by_current_thread() {
            log::error!("leave_context on a thread that does not hold the context");
            return;
        }
        self.inner.depth.fetch_sub(1, Ordering::AcqRel);
        // SAFETY: this thread owns the lock, so at least one guard forgotten
        // in `enter_context` on this thread is still outstanding
        unsafe { self.inner.context.force_unlock() };
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
        flags: TextureFlags,
    ) -> Option<TextureHandle> {
        self.check_context("create_texture");

        let size = width as usize * height as usize * format.bytes_per_pixel();
        let mut state = self.inner.state.lock();
        if state.device_lost {
            return None;
        }
        if let Some(budget) = state.budget {
            if state.used + size > budget {
                log::warn!(
                    "Texture allocation of {} bytes exceeds budget ({} of {} in use)",
                    size,
                    state.used,
                    budget
                );
                return None;
            }
        }

        let mut pixels = vec![0u8; size];
        if let Some(data) = data {
            if data.len() < size {
                return None;
            }
            pixels.copy_from_slice(&data[..size]);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.used += size;
        state.textures.insert(
            id,
            SoftTexture {
                width,
                height,
                data: pixels,
            },
        );
        log::trace!("texture {} created ({}x{}, {:?})", id, width, height, flags);

        Some(TextureHandle(id))
    }

    fn set_image(&self, texture: &TextureHandle, data: &[u8], stride: usize, flip: bool) -> bool {
        self.check_context("set_image");

        let mut state = self.inner.state.lock();
        if state.device_lost {
            return false;
        }
        let Some(tex) = state.textures.get_mut(&texture.0) else {
            return false;
        };

        let row = tex.width as usize * 4;
        let rows = tex.height as usize;
        if rows == 0 {
            return true;
        }
        if stride < row || data.len() < stride * (rows - 1) + row {
            return false;
        }

        for y in 0..rows {
            let src_y = if flip { rows - 1 - y } else { y };
            let src = &data[src_y * stride..src_y * stride + row];
            tex.data[y * row..(y + 1) * row].copy_from_slice(src);
        }
        true
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        self.check_context("destroy_texture");

        let mut state = self.inner.state.lock();
        if let Some(tex) = state.textures.remove(&texture.0) {
            state.used -= tex.data.len();
        }
    }

    fn texture_size(&self, texture: &TextureHandle) -> (u32, u32) {
        let state = self.inner.state.lock();
        state
            .textures
            .get(&texture.0)
            .map(|t| (t.width, t.height))
            .unwrap_or((0, 0))
    }

    fn enable_blending(&self, enable: bool) {
        self.inner.state.lock().blending = enable;
    }

    fn blend_function(&self, src: BlendFactor, dst: BlendFactor) {
        self.inner.state.lock().blend = (src, dst);
    }

    fn draw_sprite(&self, texture: &TextureHandle, x: i32, y: i32) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.draw_calls += 1;

        let Some(tex) = state.textures.get(&texture.0) else {
            return;
        };
        let (src_f, dst_f) = state.blend;
        let blending = state.blending;
        let fb_width = state.fb_width as i64;
        let fb_height = state.fb_height as i64;

        for ty in 0..tex.height as i64 {
            let fy = y as i64 + ty;
            if fy < 0 || fy >= fb_height {
                continue;
            }
            for tx in 0..tex.width as i64 {
                let fx = x as i64 + tx;
                if fx < 0 || fx >= fb_width {
                    continue;
                }
                let s = ((ty * tex.width as i64 + tx) * 4) as usize;
                let d = ((fy * fb_width + fx) * 4) as usize;
                let src = &tex.data[s..s + 4];
                let dst = &mut state.framebuffer[d..d + 4];

                if !blending {
                    dst.copy_from_slice(src);
                    continue;
                }

                let alpha = src[3] as u32;
                let fs = factor(src_f, alpha);
                let fd = factor(dst_f, alpha);
                for c in 0..4 {
                    let value = (src[c] as u32 * fs + dst[c] as u32 * fd) / 255;
                    dst[c] = value.min(255) as u8;
                }
            }
        }
    }
}

/// Effect that records which texture is bound to each parameter
#[derive(Debug, Default)]
pub struct SimpleEffect {
    bindings: HashMap<String, u64>,
}

impl SimpleEffect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the texture bound to `param`
    pub fn bound_texture(&self, param: &str) -> Option<u64> {
        self.bindings.get(param).copied()
    }
}

impl Effect<SoftwareGraphics> for SimpleEffect {
    fn set_texture(&mut self, param: &str, texture: &TextureHandle) -> bool {
        self.bindings.insert(param.to_string(), texture.id());
        true
    }
}
