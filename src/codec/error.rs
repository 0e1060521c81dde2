//! Error types for the codec layer.
//!
//! # Error Categories
//!
//! - [`FramingError`]: a frame declaration that can never be satisfied (oversized or unparsable
//!   length). The connection carrying it must be closed.
//! - [`EofError`]: the peer closed the stream part-way through a frame.
//! - [`CodecError`]: top-level enum wrapping both categories plus I/O errors.

use std::io;

use thiserror::Error;

/// Framing-level errors raised while locating frame boundaries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Declared or accumulated payload exceeds the configured ceiling.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Payload size declared by the frame, or buffered without a delimiter.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },

    /// Length field is not a well-formed number.
    #[error("invalid frame length encoding")]
    InvalidLengthEncoding,

    /// Length field does not fit the platform's address space.
    #[error("frame length overflows usize")]
    LengthOverflow,
}

/// End-of-stream conditions.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The stream ended with bytes that never completed a frame.
    #[error("stream ended with {bytes} bytes of an incomplete frame")]
    TrailingData {
        /// Number of discarded bytes.
        bytes: usize,
    },
}

/// Top-level codec error taxonomy.
///
/// # Examples
///
/// ```
/// use relayframe::codec::{CodecError, EofError, FramingError};
///
/// let err = CodecError::Framing(FramingError::InvalidLengthEncoding);
/// assert!(err.is_malformed());
/// assert_eq!(err.error_type(), "framing");
///
/// let err = CodecError::Eof(EofError::TrailingData { bytes: 3 });
/// assert!(!err.is_malformed());
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// Framing layer error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// End-of-stream handling.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Returns true if the stream declared a frame that can never be valid.
    #[must_use]
    pub fn is_malformed(&self) -> bool { matches!(self, Self::Framing(_)) }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of: `"framing"`, `"io"`, or `"eof"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::Io(_) => "io",
            Self::Eof(_) => "eof",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Eof(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}
