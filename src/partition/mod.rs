//! Frame partitioners.
//!
//! A partitioner inspects the unconsumed bytes of a connection and reports
//! where the next complete message ends. Partitioners never mutate the buffer
//! and hold no per-connection state: the caller owns the buffer and the scan
//! cursor returned through [`Extraction::NeedMoreData`].
//!
//! Five framing strategies are supported:
//!
//! - `delimiter`: messages end with a delimiter sequence, which stays part of the message.
//! - `ascii`: a decimal length terminated by the delimiter, found at a fixed offset.
//! - `binary`/`binary_le`: a little-endian 1, 2, 4 or 8 byte length at a fixed offset.
//! - `binary_be`: as `binary`, but big-endian.
//! - `fixed`: every message has the same size.

use std::{fmt, ops::Range, str::FromStr};

use thiserror::Error;

use crate::codec::FramingError;

mod ascii;
mod binary;
mod delimiter;
mod fixed;
pub mod length;

pub use ascii::AsciiPartitioner;
pub use binary::BinaryPartitioner;
pub use delimiter::DelimiterPartitioner;
pub use fixed::FixedPartitioner;
pub use length::{Endianness, LengthFormat, LengthWidth};

/// Default ceiling for a single message payload (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Location of a complete frame at the start of a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBounds {
    /// Offset one past the last byte of the frame.
    pub end: usize,
    /// Range of the payload within the frame, excluding offsets, length
    /// fields and delimiters.
    pub payload: Range<usize>,
}

/// Result of asking a partitioner for the next frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// A complete frame starts at the beginning of the buffer.
    Found(FrameBounds),
    /// The buffer holds no complete frame yet. Bytes before `resume_at` have
    /// been scanned and need not be inspected again on the next call.
    NeedMoreData { resume_at: usize },
}

/// Framing strategy selected by the `Partitioner` option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionerKind {
    Delimiter,
    Ascii,
    Binary,
    BinaryBigEndian,
    Fixed,
}

/// Raised when a `Partitioner` option names no known strategy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown partitioner: {0}")]
pub struct UnknownPartitioner(pub String);

impl FromStr for PartitionerKind {
    type Err = UnknownPartitioner;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delimiter" => Ok(Self::Delimiter),
            "ascii" => Ok(Self::Ascii),
            "binary" | "binary_le" => Ok(Self::Binary),
            "binary_be" => Ok(Self::BinaryBigEndian),
            "fixed" => Ok(Self::Fixed),
            _ => Err(UnknownPartitioner(s.to_owned())),
        }
    }
}

impl fmt::Display for PartitionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delimiter => "delimiter",
            Self::Ascii => "ascii",
            Self::Binary => "binary",
            Self::BinaryBigEndian => "binary_be",
            Self::Fixed => "fixed",
        })
    }
}

/// A configured framing strategy.
///
/// The variant is chosen once when the consumer is configured, so the
/// per-read path dispatches on a closed enum rather than a lookup table.
///
/// # Examples
///
/// ```
/// use relayframe::partition::{Extraction, FrameBounds, Partitioner};
///
/// let partitioner = Partitioner::delimiter(b"\n".to_vec()).expect("non-empty delimiter");
/// assert_eq!(
///     partitioner.try_extract(b"hello\nwor", 0),
///     Ok(Extraction::Found(FrameBounds { end: 6, payload: 0..5 }))
/// );
/// assert_eq!(
///     partitioner.try_extract(b"wor", 0),
///     Ok(Extraction::NeedMoreData { resume_at: 3 })
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Partitioner {
    Delimiter(DelimiterPartitioner),
    Ascii(AsciiPartitioner),
    Binary(BinaryPartitioner),
    Fixed(FixedPartitioner),
}

impl Partitioner {
    /// Split on `delimiter`.
    ///
    /// Returns `None` if `delimiter` is empty.
    #[must_use]
    pub fn delimiter(delimiter: Vec<u8>) -> Option<Self> {
        DelimiterPartitioner::new(delimiter, DEFAULT_MAX_MESSAGE_SIZE).map(Self::Delimiter)
    }

    /// Read a decimal length at `offset`, terminated by `delimiter`.
    ///
    /// Returns `None` if `delimiter` is empty.
    #[must_use]
    pub fn ascii(offset: usize, delimiter: Vec<u8>) -> Option<Self> {
        AsciiPartitioner::new(offset, delimiter, DEFAULT_MAX_MESSAGE_SIZE).map(Self::Ascii)
    }

    /// Read a binary length at `offset` using `format`.
    #[must_use]
    pub fn binary(offset: usize, format: LengthFormat) -> Self {
        Self::Binary(BinaryPartitioner::new(
            offset,
            format,
            DEFAULT_MAX_MESSAGE_SIZE,
        ))
    }

    /// Cut the stream into messages of exactly `size` bytes.
    ///
    /// Returns `None` if `size` is zero.
    #[must_use]
    pub fn fixed(size: usize) -> Option<Self> { FixedPartitioner::new(size).map(Self::Fixed) }

    /// Replace the payload ceiling. Has no effect on `fixed` partitioners,
    /// whose size is validated against the ceiling at configuration time.
    #[must_use]
    pub fn with_max_message_size(self, max: usize) -> Self {
        match self {
            Self::Delimiter(p) => Self::Delimiter(p.with_max_message_size(max)),
            Self::Ascii(p) => Self::Ascii(p.with_max_message_size(max)),
            Self::Binary(p) => Self::Binary(p.with_max_message_size(max)),
            Self::Fixed(p) => Self::Fixed(p),
        }
    }

    /// The strategy implemented by this partitioner.
    #[must_use]
    pub fn kind(&self) -> PartitionerKind {
        match self {
            Self::Delimiter(_) => PartitionerKind::Delimiter,
            Self::Ascii(_) => PartitionerKind::Ascii,
            Self::Binary(p) => match p.format().endianness {
                Endianness::Little => PartitionerKind::Binary,
                Endianness::Big => PartitionerKind::BinaryBigEndian,
            },
            Self::Fixed(_) => PartitionerKind::Fixed,
        }
    }

    /// Locate the next complete frame at the start of `buf`.
    ///
    /// `scan_from` is the `resume_at` value returned by the previous call on
    /// the same, possibly grown, buffer, or `0` after a frame was consumed.
    ///
    /// # Errors
    /// Returns a [`FramingError`] if the buffer declares a frame that can
    /// never be valid, such as a length above the payload ceiling.
    pub fn try_extract(&self, buf: &[u8], scan_from: usize) -> Result<Extraction, FramingError> {
        match self {
            Self::Delimiter(p) => p.try_extract(buf, scan_from),
            Self::Ascii(p) => p.try_extract(buf),
            Self::Binary(p) => p.try_extract(buf),
            Self::Fixed(p) => Ok(p.try_extract(buf)),
        }
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [] => Some(0),
        [byte] => haystack.iter().position(|b| b == byte),
        _ => haystack
            .windows(needle.len())
            .position(|window| window == needle),
    }
}
