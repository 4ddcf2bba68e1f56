//! Error types for frame buffers and projector devices.

use crate::frames::Rect;
use std::error::Error as StdError;
use std::fmt;

// ── Frame errors ─────────────────────────────────────────────────────

/// Errors raised by [`FrameBuffer`](crate::FrameBuffer) and the pattern
/// routines built on it.
///
/// Every variant is reported before any pixel is written, so a failed call
/// leaves the buffer exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A buffer dimension was zero, or the total size overflows `usize`.
    InvalidDimension {
        frame_count: usize,
        width: usize,
        height: usize,
    },

    /// A frame or pixel index was outside `0..limit`.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// A rectangle (or stripe, or tile) does not fit inside the frame.
    OutOfBounds {
        rect: Rect,
        width: usize,
        height: usize,
    },

    /// A drawing routine was called with arguments it cannot honour.
    InvalidArgument(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::InvalidDimension {
                frame_count,
                width,
                height,
            } => write!(
                f,
                "invalid dimension: {frame_count} frame(s) of {width}x{height} pixels"
            ),
            FrameError::IndexOutOfRange { what, index, limit } => {
                write!(f, "{what} index {index} out of range (limit {limit})")
            }
            FrameError::OutOfBounds {
                rect,
                width,
                height,
            } => write!(
                f,
                "rectangle {}x{} at ({}, {}) exceeds {}x{} frame",
                rect.width, rect.height, rect.left, rect.top, width, height
            ),
            FrameError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl StdError for FrameError {}

impl FrameError {
    /// Create an invalid argument error with a message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        FrameError::InvalidArgument(msg.into())
    }

    pub fn is_invalid_dimension(&self) -> bool {
        matches!(self, FrameError::InvalidDimension { .. })
    }

    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, FrameError::IndexOutOfRange { .. })
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, FrameError::OutOfBounds { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, FrameError::InvalidArgument(_))
    }
}

// ── Device errors ────────────────────────────────────────────────────

/// Errors reported by an [`AlpDevice`](crate::device::AlpDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device has not been allocated, or was already freed.
    NotAllocated,

    /// A handle or parameter was rejected before reaching the hardware.
    InvalidParameter(String),

    /// A vendor API call returned an error code.
    Call {
        call: &'static str,
        message: String,
    },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotAllocated => write!(f, "device not allocated"),
            DeviceError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            DeviceError::Call { call, message } => write!(f, "{call} failed: {message}"),
        }
    }
}

impl StdError for DeviceError {}

impl DeviceError {
    /// Create an invalid parameter error with a message.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        DeviceError::InvalidParameter(msg.into())
    }

    /// Create a failed-call error for the named vendor call.
    pub fn call(call: &'static str, message: impl Into<String>) -> Self {
        DeviceError::Call {
            call,
            message: message.into(),
        }
    }

    pub fn is_not_allocated(&self) -> bool {
        matches!(self, DeviceError::NotAllocated)
    }
}
