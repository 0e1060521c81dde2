//! Tokio codec driving a [`Partitioner`] over a connection buffer.
//!
//! [`FrameDecoder`] owns the per-connection scan cursor and implements
//! [`tokio_util::codec::Decoder`], so a [`FramedRead`](tokio_util::codec::FramedRead)
//! supplies the buffering. Frames are split off the front of the buffer as
//! soon as the partitioner reports them, in arrival order.
//!
//! # Error Handling
//!
//! A [`FramingError`] ends decoding for the connection. At end-of-stream any
//! leftover bytes are dropped and reported as [`EofError::TrailingData`].

use std::ops::Range;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::partition::{Extraction, Partitioner};

pub mod error;

pub use error::{CodecError, EofError, FramingError};

/// A complete frame split off a connection buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
    payload: Range<usize>,
}

impl Frame {
    /// All bytes of the frame, including offsets, length fields and delimiters.
    #[must_use]
    pub fn data(&self) -> &Bytes { &self.data }

    /// The payload portion of the frame, without copying.
    #[must_use]
    pub fn payload(&self) -> Bytes { self.data.slice(self.payload.clone()) }

    /// Consume the frame, returning all of its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes { self.data }
}

/// Decoder that splits a byte stream into frames with a [`Partitioner`].
#[derive(Clone, Debug)]
pub struct FrameDecoder {
    partitioner: Partitioner,
    scan_from: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new(partitioner: Partitioner) -> Self {
        Self {
            partitioner,
            scan_from: 0,
        }
    }

    #[must_use]
    pub fn partitioner(&self) -> &Partitioner { &self.partitioner }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.partitioner.try_extract(src, self.scan_from)? {
            Extraction::Found(bounds) => {
                self.scan_from = 0;
                Ok(Some(Frame {
                    data: src.split_to(bounds.end).freeze(),
                    payload: bounds.payload,
                }))
            }
            Extraction::NeedMoreData { resume_at } => {
                self.scan_from = resume_at;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // Clean close: the stream ended on a frame boundary.
        if src.is_empty() {
            return Ok(None);
        }
        let bytes = src.len();
        src.clear();
        self.scan_from = 0;
        Err(EofError::TrailingData { bytes }.into())
    }
}
