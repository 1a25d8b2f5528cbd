//! Capture source lifecycle
//!
//! [`CaptureSession`] composes the frame source, the texture bridge and the
//! cursor overlay. Creation acquires them in dependency order; any failure
//! drops the partially built session, whose teardown releases exactly what
//! was acquired, in reverse.

use std::time::Instant;

use crate::capture::{DisplayServer, FrameSource, SharedMemory};
use crate::cursor::CursorOverlay;
use crate::error::{CaptureError, CaptureResult};
use crate::graphics::{Effect, Graphics, GraphicsContext, TextureBridge};
use crate::types::{SourceSettings, TickStats};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Resources are still being acquired
    Uninitialized,
    /// Fully created, no frame callback has run yet
    Created,
    /// The last callback was a tick
    Ticking,
    /// The last callback was a render
    Rendering,
    /// Torn down; terminal
    Destroyed,
}

/// A live screen capture source
pub struct CaptureSession<D, M, G, K>
where
    D: DisplayServer,
    M: SharedMemory,
    G: Graphics,
    K: CursorOverlay<G, Connection = D::Connection>,
{
    cursor: Option<K>,
    texture: TextureBridge<G>,
    source: FrameSource<D::Connection, M>,
    graphics: G,
    settings: SourceSettings,
    state: SessionState,
    stats: TickStats,
}

impl<D, M, G, K> CaptureSession<D, M, G, K>
where
    D: DisplayServer,
    M: SharedMemory,
    G: Graphics,
    K: CursorOverlay<G, Connection = D::Connection>,
{
    /// Open the display, allocate the shared buffer, capture a seed frame,
    /// create the texture from it and initialise the cursor.
    pub fn create(
        display: &D,
        memory: M,
        graphics: G,
        settings: SourceSettings,
    ) -> CaptureResult<Self> {
        let result = Self::build(display, memory, graphics, settings);
        match &result {
            Ok(session) => {
                let (width, height) = session.texture.dimensions();
                log::info!("Screen capture source created ({}x{})", width, height);
            }
            Err(e) => log::error!("Failed to create screen capture source: {}", e),
        }
        result
    }

    fn build(display: &D, memory: M, graphics: G, settings: SourceSettings) -> CaptureResult<Self> {
        let source = FrameSource::open(display, memory, settings.display.as_deref())?;

        // From here on an early return drops `session`, unwinding what was acquired
        let mut session = Self {
            cursor: None,
            texture: TextureBridge::empty(),
            source,
            graphics,
            settings,
            state: SessionState::Uninitialized,
            stats: TickStats::default(),
        };

        session.source.allocate_buffer()?;
        Self::pull(&mut session.source, &mut session.stats)?;

        {
            let ctx = GraphicsContext::enter(&session.graphics);

            let (Some(image), Some(pixels)) = (session.source.image(), session.source.pixels())
            else {
                return Err(CaptureError::FrameFailed("no frame buffer mapped".to_string()));
            };
            session.texture = TextureBridge::create(
                &ctx,
                image.width,
                image.height,
                image.format,
                pixels,
                image.stride,
            )?;

            let connection = session.source.connection().ok_or_else(|| {
                CaptureError::ConnectionFailed("connection closed".to_string())
            })?;
            session.cursor = Some(K::init(connection, &ctx)?);
        }

        session.state = SessionState::Created;
        Ok(session)
    }

    /// Pull a frame and record the outcome in the statistics
    fn pull(source: &mut FrameSource<D::Connection, M>, stats: &mut TickStats) -> CaptureResult<()> {
        let start = Instant::now();
        match source.pull_frame() {
            Ok(()) => {
                if stats.failure_streak > 0 {
                    log::info!(
                        "Screen capture recovered after {} failed frames",
                        stats.failure_streak
                    );
                }
                stats.frames_pulled += 1;
                stats.failure_streak = 0;
                stats.total_pull_time += start.elapsed();
                Ok(())
            }
            Err(e) => {
                if stats.failure_streak == 0 {
                    log::warn!("Screen capture failed, keeping previous frame: {}", e);
                } else {
                    log::trace!("Screen capture still failing: {}", e);
                }
                stats.pull_failures += 1;
                stats.failure_streak += 1;
                Err(e)
            }
        }
    }

    /// Record the outcome of a texture upload in the statistics
    fn record_upload(result: CaptureResult<()>, stats: &mut TickStats) {
        match result {
            Ok(()) => {
                if stats.upload_failure_streak > 0 {
                    log::info!(
                        "Screen texture upload recovered after {} failures",
                        stats.upload_failure_streak
                    );
                }
                stats.upload_failure_streak = 0;
            }
            Err(e) => {
                if stats.upload_failure_streak == 0 {
                    log::warn!("Screen texture update failed, keeping previous frame: {}", e);
                } else {
                    log::trace!("Screen texture update still failing: {}", e);
                }
                stats.upload_failures += 1;
                stats.upload_failure_streak += 1;
            }
        }
    }

    /// Per-frame update: pull the screen, upload it, advance the cursor.
    ///
    /// Pull failures are not reported; the texture keeps the last frame that
    /// was captured successfully. `_seconds` is unused, the capture rate
    /// follows the host's tick rate.
    pub fn tick(&mut self, _seconds: f32) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.state = SessionState::Ticking;

        let ctx = GraphicsContext::enter(&self.graphics);

        // Best effort: a failed pull leaves the previous frame in place
        if Self::pull(&mut self.source, &mut self.stats).is_ok() {
            if let (Some(image), Some(pixels)) = (self.source.image(), self.source.pixels()) {
                let result = self.texture.update(&ctx, pixels, image.stride);
                Self::record_upload(result, &mut self.stats);
            }
        }

        if let Some(cursor) = self.cursor.as_mut() {
            cursor.tick(&ctx);
        }
    }

    /// Draw the captured frame opaquely at the origin, then the cursor.
    /// Runs inside the host's graphics context.
    pub fn render<E>(&mut self, effect: &mut E)
    where
        E: Effect<G> + ?Sized,
    {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.state = SessionState::Rendering;

        let Some(texture) = self.texture.texture() else {
            return;
        };

        effect.set_texture("image", texture);
        self.graphics.enable_blending(false);
        self.graphics.draw_sprite(texture, 0, 0);

        if self.settings.show_cursor {
            if let Some(cursor) = &self.cursor {
                cursor.render(&self.graphics);
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.texture.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.texture.dimensions().1
    }

    /// Release the cursor and texture inside one context acquisition, then
    /// close the frame source. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }

        {
            let ctx = GraphicsContext::enter(&self.graphics);
            if let Some(mut cursor) = self.cursor.take() {
                cursor.destroy(&ctx);
            }
            self.texture.destroy(&ctx);
        }

        self.source.close();

        if self.state != SessionState::Uninitialized {
            log::info!("Screen capture source destroyed");
        }
        self.state = SessionState::Destroyed;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn graphics(&self) -> &G {
        &self.graphics
    }

    /// The source texture, while the session is alive
    pub fn texture(&self) -> Option<&G::Texture> {
        self.texture.texture()
    }
}

impl<D, M, G, K> Drop for CaptureSession<D, M, G, K>
where
    D: DisplayServer,
    M: SharedMemory,
    G: Graphics,
    K: CursorOverlay<G, Connection = D::Connection>,
{
    fn drop(&mut self) {
        self.destroy();
    }
}
