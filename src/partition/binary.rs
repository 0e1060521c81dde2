//! Messages prefixed with a binary length.

use super::{Extraction, FrameBounds, LengthFormat};
use crate::codec::FramingError;

/// Reads a fixed-width binary payload length at a fixed offset.
///
/// The frame layout is `offset bytes | length | payload`. The length counts
/// payload bytes only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryPartitioner {
    offset: usize,
    format: LengthFormat,
    max_message_size: usize,
}

impl BinaryPartitioner {
    #[must_use]
    pub const fn new(offset: usize, format: LengthFormat, max_message_size: usize) -> Self {
        Self {
            offset,
            format,
            max_message_size,
        }
    }

    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    #[must_use]
    pub const fn format(&self) -> LengthFormat { self.format }

    pub(super) fn try_extract(&self, buf: &[u8]) -> Result<Extraction, FramingError> {
        let Some(declared) = buf
            .get(self.offset..)
            .and_then(|field| self.format.read_len(field))
        else {
            return Ok(Extraction::NeedMoreData { resume_at: 0 });
        };

        let len = usize::try_from(declared).map_err(|_| FramingError::LengthOverflow)?;
        if len > self.max_message_size {
            return Err(FramingError::OversizedFrame {
                size: len,
                max: self.max_message_size,
            });
        }

        let payload_start = self.offset + self.format.width.bytes();
        let end = payload_start
            .checked_add(len)
            .ok_or(FramingError::LengthOverflow)?;
        if buf.len() < end {
            return Ok(Extraction::NeedMoreData { resume_at: 0 });
        }
        Ok(Extraction::Found(FrameBounds {
            end,
            payload: payload_start..end,
        }))
    }
}
