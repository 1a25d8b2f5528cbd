//! Resource-accounting doubles of the display server, shared memory and cursor

#![allow(dead_code)]

use std::cell::{RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::ptr::NonNull;
use std::rc::Rc;

use xshm_source::*;

pub type FakeSession = CaptureSession<FakeDisplay, FakeShm, SoftwareGraphics, FakeCursor>;

/// Which step should fail
#[derive(Debug, Default, Clone)]
pub struct Failures {
    pub open: bool,
    pub shm_missing: bool,
    pub create_segment: bool,
    pub map_segment: bool,
    pub attach: bool,
    pub pull: bool,
    pub cursor_init: bool,
}

struct Segment {
    ptr: NonNull<u8>,
    len: usize,
}

#[derive(Default)]
pub struct FakeState {
    pub screen: ScreenInfo,
    pub fail: Failures,

    pub connections_opened: usize,
    pub open_connections: usize,

    segments: HashMap<i32, Segment>,
    next_shmid: i32,
    pub segments_created: usize,
    pub removed: HashSet<i32>,
    /// shmid of every live mapping
    pub mapped: HashSet<i32>,
    /// server segment -> shmid
    pub attached: HashMap<u32, i32>,
    next_segment: u32,

    pub pulls: usize,
    pub frame_value: u8,

    pub cursor_inits: usize,
    pub cursor_ticks: usize,
    pub cursor_renders: usize,
    pub live_cursors: usize,

    /// Ordered record of acquisitions and releases
    pub events: Vec<String>,
    /// Ordering rules broken (unmap while attached, detach after unmap)
    pub violations: Vec<String>,
}

impl FakeState {
    pub fn live_segments(&self) -> usize {
        self.segments_created - self.removed.len()
    }

    pub fn assert_released(&self) {
        assert_eq!(self.open_connections, 0, "connection left open");
        assert_eq!(self.live_segments(), 0, "segment not removed");
        assert!(self.mapped.is_empty(), "segment left mapped");
        assert!(self.attached.is_empty(), "segment left attached");
        assert_eq!(self.live_cursors, 0, "cursor not destroyed");
        assert!(self.violations.is_empty(), "ordering violations: {:?}", self.violations);
    }
}

impl Drop for FakeState {
    fn drop(&mut self) {
        for (_, segment) in self.segments.drain() {
            let slice = std::ptr::slice_from_raw_parts_mut(segment.ptr.as_ptr(), segment.len);
            // SAFETY: allocated with Box::into_raw in `FakeShm::create`
            drop(unsafe { Box::from_raw(slice) });
        }
    }
}

/// Shared handle on the fake system state
#[derive(Clone, Default)]
pub struct FakeSystem(Rc<RefCell<FakeState>>);

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screen(width: u32, height: u32) -> Self {
        let system = Self::default();
        system.state().screen = ScreenInfo {
            width,
            height,
            root: 0x1a5,
            ..Default::default()
        };
        system
    }

    pub fn state(&self) -> RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }

    pub fn display(&self) -> FakeDisplay {
        FakeDisplay(self.clone())
    }

    pub fn memory(&self) -> FakeShm {
        FakeShm(self.clone())
    }
}

#[derive(Default)]
pub struct FakeDisplay(FakeSystem);

impl DisplayServer for FakeDisplay {
    type Connection = FakeConnection;

    fn open(&self, _display: Option<&str>) -> CaptureResult<FakeConnection> {
        let mut state = self.0.state();
        if state.fail.open {
            return Err(CaptureError::ConnectionFailed("no display".to_string()));
        }
        state.connections_opened += 1;
        state.open_connections += 1;
        state.events.push("open".to_string());
        Ok(FakeConnection(self.0.clone()))
    }
}

pub struct FakeConnection(pub FakeSystem);

impl Drop for FakeConnection {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.open_connections -= 1;
        state.events.push("close".to_string());
    }
}

impl ShmConnection for FakeConnection {
    fn screen(&self) -> ScreenInfo {
        self.0.state().screen
    }

    fn shm_supported(&self) -> bool {
        !self.0.state().fail.shm_missing
    }

    fn shm_attach(&self, shmid: i32) -> CaptureResult<u32> {
        let mut state = self.0.state();
        if state.fail.attach {
            return Err(CaptureError::AttachFailed("BadAccess".to_string()));
        }
        if !state.mapped.contains(&shmid) {
            state.violations.push(format!("attach of unmapped segment {}", shmid));
        }
        state.next_segment += 1;
        let segment = 0x0040_0000 + state.next_segment;
        state.attached.insert(segment, shmid);
        state.events.push("attach".to_string());
        Ok(segment)
    }

    fn shm_detach(&self, segment: u32) {
        let mut state = self.0.state();
        match state.attached.remove(&segment) {
            Some(shmid) if !state.mapped.contains(&shmid) => {
                state.violations.push(format!("detach after unmap of {}", shmid));
            }
            Some(_) => {}
            None => state.violations.push(format!("detach of unknown 0x{:x}", segment)),
        }
        state.events.push("detach".to_string());
    }

    fn shm_get_image(&self, _drawable: u32, segment: u32, width: u32, height: u32)
        -> CaptureResult<()> {
        let mut state = self.0.state();
        if state.fail.pull {
            return Err(CaptureError::FrameFailed("BadMatch".to_string()));
        }
        let shmid = *state
            .attached
            .get(&segment)
            .ok_or_else(|| CaptureError::FrameFailed("BadShmSeg".to_string()))?;

        state.pulls += 1;
        state.frame_value = state.frame_value.wrapping_add(1);
        let value = state.frame_value;

        let segment = &state.segments[&shmid];
        let len = (width * height * 4) as usize;
        assert!(len <= segment.len);
        // SAFETY: the segment allocation is `segment.len` bytes and lives as long as the state
        let pixels = unsafe { std::slice::from_raw_parts_mut(segment.ptr.as_ptr(), len) };
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&[value, value, value, 0xFF]);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeShm(FakeSystem);

impl SharedMemory for FakeShm {
    fn create(&self, size: usize) -> CaptureResult<i32> {
        let mut state = self.0.state();
        if state.fail.create_segment {
            return Err(CaptureError::AllocationFailed {
                size,
                reason: "ENOSPC".to_string(),
            });
        }
        state.next_shmid += 1;
        let shmid = state.next_shmid;
        let raw = Box::into_raw(vec![0u8; size].into_boxed_slice());
        let ptr = NonNull::new(raw as *mut u8).expect("box pointer is non-null");
        state.segments.insert(shmid, Segment { ptr, len: size });
        state.segments_created += 1;
        state.events.push("create".to_string());
        Ok(shmid)
    }

    fn map(&self, shmid: i32) -> CaptureResult<NonNull<u8>> {
        let mut state = self.0.state();
        if state.fail.map_segment {
            return Err(CaptureError::AllocationFailed {
                size: 0,
                reason: "EACCES".to_string(),
            });
        }
        let ptr = state.segments[&shmid].ptr;
        state.mapped.insert(shmid);
        state.events.push("map".to_string());
        Ok(ptr)
    }

    fn unmap(&self, addr: NonNull<u8>) {
        let mut state = self.0.state();
        let shmid = state
            .segments
            .iter()
            .find(|(_, s)| s.ptr == addr)
            .map(|(id, _)| *id);
        match shmid {
            Some(id) => {
                if state.attached.values().any(|&a| a == id) {
                    state.violations.push(format!("unmap of attached segment {}", id));
                }
                state.mapped.remove(&id);
            }
            None => state.violations.push("unmap of unknown address".to_string()),
        }
        state.events.push("unmap".to_string());
    }

    fn remove(&self, shmid: i32) {
        let mut state = self.0.state();
        if !state.removed.insert(shmid) {
            state.violations.push(format!("segment {} removed twice", shmid));
        }
        state.events.push("remove".to_string());
    }
}

/// Cursor double that counts its lifecycle calls
pub struct FakeCursor {
    connection: Rc<FakeConnection>,
    destroyed: bool,
}

impl CursorOverlay<SoftwareGraphics> for FakeCursor {
    type Connection = FakeConnection;

    fn init(
        connection: Rc<FakeConnection>,
        ctx: &GraphicsContext<'_, SoftwareGraphics>,
    ) -> CaptureResult<Self> {
        assert!(ctx.graphics().context_depth() > 0);
        {
            let mut state = connection.0.state();
            if state.fail.cursor_init {
                return Err(CaptureError::CursorFailed("XFixes missing".to_string()));
            }
            state.cursor_inits += 1;
            state.live_cursors += 1;
            state.events.push("cursor_init".to_string());
        }
        Ok(Self {
            connection,
            destroyed: false,
        })
    }

    fn tick(&mut self, ctx: &GraphicsContext<'_, SoftwareGraphics>) {
        assert!(ctx.graphics().context_depth() > 0);
        self.connection.0.state().cursor_ticks += 1;
    }

    fn render(&self, _graphics: &SoftwareGraphics) {
        self.connection.0.state().cursor_renders += 1;
    }

    fn destroy(&mut self, _ctx: &GraphicsContext<'_, SoftwareGraphics>) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let mut state = self.connection.0.state();
        state.live_cursors -= 1;
        state.events.push("cursor_destroy".to_string());
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Graphics sized to the screen of `system`
pub fn graphics_for(system: &FakeSystem) -> SoftwareGraphics {
    let screen = system.state().screen;
    SoftwareGraphics::new(screen.width, screen.height)
}

pub fn create_session(system: &FakeSystem, graphics: SoftwareGraphics) -> CaptureResult<FakeSession> {
    create_session_with(system, graphics, SourceSettings::default())
}

pub fn create_session_with(
    system: &FakeSystem,
    graphics: SoftwareGraphics,
    settings: SourceSettings,
) -> CaptureResult<FakeSession> {
    init_logging();
    FakeSession::create(&system.display(), system.memory(), graphics, settings)
}
