//! Datagram decoding errors.
//!
//! Every variant describes a datagram that is dropped; none of them stop the
//! receive loop.

use crate::common::ErrorSeverity;

/// Errors raised while decoding a raw UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Buffer shorter than the fixed record size for its packet kind
    #[error("{what} packet too short: {actual} bytes (need {expected})")]
    TooShort {
        /// Packet kind being decoded
        what: &'static str,
        /// Bytes received
        actual: usize,
        /// Fixed record size for this kind and epoch
        expected: usize,
    },

    /// A read ran past the end of the buffer
    #[error("out of bounds: {width}-byte read at offset {offset}")]
    OutOfBounds {
        /// Offset of the failed read
        offset: usize,
        /// Width of the failed read in bytes
        width: usize,
    },

    /// Header format identifier is not a supported protocol epoch
    #[error("unsupported packet format {0}")]
    UnknownFormat(u16),

    /// Car index does not address an entry of the per-car array
    #[error("car index {index} out of range (max {max})")]
    CarIndexOutOfRange {
        /// Index that was requested
        index: usize,
        /// Highest valid index
        max: usize,
    },
}

impl DecodeError {
    /// Create a [`DecodeError::TooShort`].
    pub fn too_short(what: &'static str, actual: usize, expected: usize) -> Self {
        DecodeError::TooShort {
            what,
            actual,
            expected,
        }
    }

    /// Get the severity for logging.
    ///
    /// Unknown formats are routine (other games share the port); short
    /// buffers and bad indices hint at a corrupt or mis-identified feed.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DecodeError::UnknownFormat(_) => ErrorSeverity::Info,
            DecodeError::CarIndexOutOfRange { .. } => ErrorSeverity::Info,
            DecodeError::TooShort { .. } | DecodeError::OutOfBounds { .. } => {
                ErrorSeverity::Warning
            }
        }
    }
}
