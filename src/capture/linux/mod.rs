//! Linux backends: X11 connection with MIT-SHM and System V shared memory

mod shm;
mod x11_capture;

pub use shm::SysvShm;
pub use x11_capture::{X11Connection, X11Display};
