//! Error type shared by format construction and parsing.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// Requested bytes run past the end of the current window.
    #[error("Out of range: {what} needs {needed} byte(s) at 0x{offset:x}, {available} available")]
    OutOfRange {
        what: String,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Value mismatch in {field}: expected {expected:?}, found {found:?}")]
    ValueMismatch {
        field: String,
        expected: Value,
        found: Value,
    },
    /// An explicit address lies behind the cursor.
    #[error("Non-monotonic address: 0x{address:x} is before cursor 0x{position:x}")]
    NonMonotonicAddress { address: usize, position: usize },
    #[error("Overlapping bit range: {field} overlaps {other}")]
    OverlappingBitRange { field: String, other: String },
    /// A remnant, or an unbounded chunk ending in one, followed by more siblings.
    #[error("Remnant must be the last element of a chunk (found at index {index})")]
    MisplacedRemnant { index: usize },
    /// Zero-length or otherwise invalid descriptor parameters.
    #[error("Invalid descriptor: {0}")]
    DuplicateConfiguration(String),
}

impl LayoutError {
    /// True for failures caused by the input bytes rather than the format definition.
    /// Optional chunks fall back on these and propagate everything else.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            LayoutError::OutOfRange { .. }
                | LayoutError::ValueMismatch { .. }
                | LayoutError::NonMonotonicAddress { .. }
        )
    }

    pub(crate) fn out_of_range(what: &str, offset: usize, needed: usize, available: usize) -> Self {
        LayoutError::OutOfRange {
            what: what.to_string(),
            offset,
            needed,
            available,
        }
    }
}
