// ============================================================================
// EDITOR ERRORS — every failure is reported and turns the operation into a no-op
// ============================================================================

use thiserror::Error;

/// Errors produced by the editor core.
///
/// None of these are fatal: the session logs them, leaves its state untouched
/// and hands the error back to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("invalid dimension {width}x{height}")]
    InvalidDimension { width: i64, height: i64 },

    #[error("region {w}x{h} at ({x}, {y}) is outside the {buf_w}x{buf_h} buffer")]
    OutOfBounds {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        buf_w: u32,
        buf_h: u32,
    },

    #[error("no image loaded")]
    NoImageLoaded,

    #[error("unknown effect {0:?}")]
    UnknownEffect(Option<String>),

    #[error("degenerate selection {width}x{height}: width and height must be greater than 0")]
    DegenerateSelection { width: f64, height: f64 },

    #[error("font family {0:?} is not available")]
    FontUnavailable(String),
}

impl EditorError {
    pub(crate) fn invalid_dimension(width: impl Into<i64>, height: impl Into<i64>) -> Self {
        EditorError::InvalidDimension {
            width: width.into(),
            height: height.into(),
        }
    }
}
