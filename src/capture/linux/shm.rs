//! System V shared memory segments

use std::io;
use std::ptr::{self, NonNull};

use crate::{
    capture::traits::SharedMemory,
    error::{CaptureError, CaptureResult},
};

/// Owner read/write only
const SEGMENT_PERMISSIONS: libc::c_int = 0o600;

/// `shmget`/`shmat` backed segments
#[derive(Debug, Clone, Copy, Default)]
pub struct SysvShm;

impl SharedMemory for SysvShm {
    fn create(&self, size: usize) -> CaptureResult<i32> {
        let shmid = unsafe {
            libc::shmget(
                libc::IPC_PRIVATE,
                size,
                libc::IPC_CREAT | SEGMENT_PERMISSIONS,
            )
        };

        if shmid < 0 {
            return Err(CaptureError::AllocationFailed {
                size,
                reason: format!("shmget: {}", io::Error::last_os_error()),
            });
        }

        Ok(shmid)
    }

    fn map(&self, shmid: i32) -> CaptureResult<NonNull<u8>> {
        let addr = unsafe { libc::shmat(shmid, ptr::null(), 0) };
        if addr == libc::MAP_FAILED {
            return Err(CaptureError::AllocationFailed {
                size: 0,
                reason: format!("shmat: {}", io::Error::last_os_error()),
            });
        }

        NonNull::new(addr as *mut u8).ok_or_else(|| CaptureError::AllocationFailed {
            size: 0,
            reason: "shmat returned null".to_string(),
        })
    }

    fn unmap(&self, addr: NonNull<u8>) {
        if unsafe { libc::shmdt(addr.as_ptr() as *const libc::c_void) } != 0 {
            log::warn!("shmdt failed: {}", io::Error::last_os_error());
        }
    }

    fn remove(&self, shmid: i32) {
        if unsafe { libc::shmctl(shmid, libc::IPC_RMID, ptr::null_mut()) } != 0 {
            log::warn!("shmctl(IPC_RMID) on {} failed: {}", shmid, io::Error::last_os_error());
        }
    }
}
