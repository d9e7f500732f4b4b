//! Error types for transport control

use thiserror::Error;

/// Playback errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// The operation needs a decoded buffer and none is attached
    #[error("No buffer loaded")]
    NotReady,

    /// A time argument fell outside its allowed interval
    #[error("{what} out of range: {value} (allowed {min}..={max})")]
    Range {
        /// Name of the offending argument
        what: &'static str,
        /// Value that was passed
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Argument could not be interpreted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Decoder reported failure
    #[error("Decode failed: {0}")]
    Decode(String),
}

impl PlaybackError {
    pub(crate) fn range(what: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::Range {
            what,
            value,
            min,
            max,
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
