//! Error types for the `ecosim-world` crate.
//!
//! Only construction can fail. Once a [`Grid`](crate::Grid) or
//! [`ResourceField`](crate::ResourceField) exists, every operation on it is
//! total: out-of-bounds cells are reported as zero effect, not as errors.

/// Errors raised when building world structures from invalid parameters.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Grid dimensions or cell size are unusable.
    #[error("invalid grid: {reason}")]
    InvalidGrid {
        /// Explanation of what is wrong with the grid parameters.
        reason: String,
    },

    /// Field parameters are out of range.
    #[error("invalid resource field: {reason}")]
    InvalidField {
        /// Explanation of what is wrong with the field parameters.
        reason: String,
    },
}
