//! Plugin-facing descriptor of the screen capture source
//!
//! A host registers sources by their [`SourceInfo`] and drives them through
//! the [`VideoSource`] callbacks: create, per-frame tick and render, size
//! queries and destroy.

use crate::capture::{DisplayServer, SharedMemory};
use crate::cursor::CursorOverlay;
use crate::error::CaptureResult;
use crate::graphics::{Effect, Graphics};
use crate::session::CaptureSession;
use crate::types::SourceSettings;

/// Kind of source a plugin registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Input,
    Filter,
    Transition,
}

/// What a source produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFlags {
    pub video: bool,
    pub audio: bool,
}

impl OutputFlags {
    pub const VIDEO: OutputFlags = OutputFlags {
        video: true,
        audio: false,
    };
}

/// Registration record of a source type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: &'static str,
    pub source_type: SourceType,
    pub output_flags: OutputFlags,
}

/// Registration record of the shared-memory screen source
pub const XSHM_INPUT: SourceInfo = SourceInfo {
    id: "xshm_input",
    source_type: SourceType::Input,
    output_flags: OutputFlags::VIDEO,
};

/// Callbacks a host drives on a video source instance
pub trait VideoSource {
    type Graphics: Graphics;

    fn info() -> SourceInfo
    where
        Self: Sized;

    /// Human readable name of the source type
    fn name(locale: &str) -> &'static str
    where
        Self: Sized;

    fn create(settings: &SourceSettings, graphics: Self::Graphics) -> CaptureResult<Self>
    where
        Self: Sized;

    fn destroy(&mut self);

    fn video_tick(&mut self, seconds: f32);

    fn video_render(&mut self, effect: &mut dyn Effect<Self::Graphics>);

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}

impl<D, M, G, K> VideoSource for CaptureSession<D, M, G, K>
where
    D: DisplayServer + Default,
    M: SharedMemory + Default,
    G: Graphics,
    K: CursorOverlay<G, Connection = D::Connection>,
{
    type Graphics = G;

    fn info() -> SourceInfo {
        XSHM_INPUT
    }

    fn name(_locale: &str) -> &'static str {
        "X11 Shared Memory Screen Input"
    }

    fn create(settings: &SourceSettings, graphics: G) -> CaptureResult<Self> {
        CaptureSession::create(&D::default(), M::default(), graphics, settings.clone())
    }

    fn destroy(&mut self) {
        CaptureSession::destroy(self)
    }

    fn video_tick(&mut self, seconds: f32) {
        self.tick(seconds)
    }

    fn video_render(&mut self, effect: &mut dyn Effect<G>) {
        self.render(effect)
    }

    fn width(&self) -> u32 {
        CaptureSession::width(self)
    }

    fn height(&self) -> u32 {
        CaptureSession::height(self)
    }
}

/// The shared-memory screen source on a real X server
#[cfg(target_os = "linux")]
pub type XshmInput<G> = CaptureSession<
    crate::capture::linux::X11Display,
    crate::capture::linux::SysvShm,
    G,
    crate::cursor::XfixesCursor<G>,
>;
