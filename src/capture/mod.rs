//! Shared-memory screen capture

pub mod frame_source;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod linux;

pub use frame_source::FrameSource;
pub use traits::{DisplayServer, SharedMemory, ShmConnection};
