//! Delimiter-separated messages.

use super::{Extraction, FrameBounds, find_subsequence};
use crate::codec::FramingError;

/// Ends a message after the first occurrence of a delimiter sequence.
///
/// The delimiter is part of the message it terminates. Scanning resumes just
/// before the end of the previously scanned region, so a delimiter split
/// across two reads is still found without rescanning the whole buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimiterPartitioner {
    delimiter: Vec<u8>,
    max_message_size: usize,
}

impl DelimiterPartitioner {
    /// Returns `None` if `delimiter` is empty.
    #[must_use]
    pub fn new(delimiter: Vec<u8>, max_message_size: usize) -> Option<Self> {
        (!delimiter.is_empty()).then_some(Self {
            delimiter,
            max_message_size,
        })
    }

    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    #[must_use]
    pub fn delimiter(&self) -> &[u8] { &self.delimiter }

    pub(super) fn try_extract(
        &self,
        buf: &[u8],
        scan_from: usize,
    ) -> Result<Extraction, FramingError> {
        let start = scan_from.min(buf.len());
        if let Some(pos) = find_subsequence(&buf[start..], &self.delimiter) {
            let payload_end = start + pos;
            if payload_end > self.max_message_size {
                return Err(FramingError::OversizedFrame {
                    size: payload_end,
                    max: self.max_message_size,
                });
            }
            return Ok(Extraction::Found(FrameBounds {
                end: payload_end + self.delimiter.len(),
                payload: 0..payload_end,
            }));
        }

        // A delimiter may already have started in the last `len - 1` bytes.
        let resume_at = buf.len().saturating_sub(self.delimiter.len() - 1);
        if resume_at > self.max_message_size {
            return Err(FramingError::OversizedFrame {
                size: resume_at,
                max: self.max_message_size,
            });
        }
        Ok(Extraction::NeedMoreData { resume_at })
    }
}
