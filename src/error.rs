//! Error types for the xshm-source library

use thiserror::Error;

/// Main error type for capture source operations
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The display server could not be reached or opened
    #[error("Cannot open display: {0}")]
    ConnectionFailed(String),

    /// A required server extension or pixel layout is missing
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Shared-memory segment creation or mapping failed
    #[error("Shared memory allocation failed ({size} bytes): {reason}")]
    AllocationFailed { size: usize, reason: String },

    /// The display server refused to attach the segment
    #[error("Shared memory attach failed: {0}")]
    AttachFailed(String),

    /// Texture allocation or update failed
    #[error("GPU resource error: {0}")]
    GpuResource(String),

    /// A frame could not be pulled from the display server
    #[error("Frame capture failed: {0}")]
    FrameFailed(String),

    /// The cursor overlay could not be initialized
    #[error("Cursor overlay failed: {0}")]
    CursorFailed(String),
}

/// Combined result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Check if the error is transient (the next frame may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CaptureError::FrameFailed(_))
    }

    /// Get a stable numeric code for host-side reporting
    pub fn to_error_code(&self) -> i32 {
        match self {
            CaptureError::ConnectionFailed(_) => -1001,
            CaptureError::Unsupported(_) => -1002,
            CaptureError::AllocationFailed { .. } => -1003,
            CaptureError::AttachFailed(_) => -1004,
            CaptureError::GpuResource(_) => -1005,
            CaptureError::FrameFailed(_) => -1006,
            CaptureError::CursorFailed(_) => -1007,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::AllocationFailed {
            size: 4096,
            reason: "ENOSPC".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shared memory allocation failed (4096 bytes): ENOSPC"
        );
    }

    #[test]
    fn test_error_code_conversion() {
        let err = CaptureError::Unsupported("MIT-SHM".to_string());
        assert_eq!(err.to_error_code(), -1002);
        assert_eq!(CaptureError::GpuResource("oom".into()).to_error_code(), -1005);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CaptureError::FrameFailed("BadMatch".to_string()).is_recoverable());
        assert!(!CaptureError::ConnectionFailed(":0".to_string()).is_recoverable());
        assert!(!CaptureError::AttachFailed("BadAccess".to_string()).is_recoverable());
    }
}
