//! Messages prefixed with a decimal length.

use super::{Extraction, FrameBounds};
use crate::codec::FramingError;

/// Longest decimal length accepted; `u64::MAX` has 20 digits.
const MAX_LENGTH_DIGITS: usize = 20;

/// Reads an ASCII decimal payload length at a fixed offset.
///
/// The frame layout is `offset bytes | digits | delimiter | payload`, and the
/// whole frame is emitted as the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiPartitioner {
    offset: usize,
    delimiter: Vec<u8>,
    max_message_size: usize,
}

impl AsciiPartitioner {
    /// Returns `None` if `delimiter` is empty.
    #[must_use]
    pub fn new(offset: usize, delimiter: Vec<u8>, max_message_size: usize) -> Option<Self> {
        (!delimiter.is_empty()).then_some(Self {
            offset,
            delimiter,
            max_message_size,
        })
    }

    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    pub(super) fn try_extract(&self, buf: &[u8]) -> Result<Extraction, FramingError> {
        let need_more = Ok(Extraction::NeedMoreData { resume_at: 0 });
        let Some(field) = buf.get(self.offset..) else {
            return need_more;
        };

        let digits = field.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > MAX_LENGTH_DIGITS {
            return Err(FramingError::InvalidLengthEncoding);
        }
        let rest = &field[digits..];
        if rest.len() < self.delimiter.len() {
            // Anything other than the start of the delimiter can never become valid.
            return if self.delimiter.starts_with(rest) {
                need_more
            } else {
                Err(FramingError::InvalidLengthEncoding)
            };
        }
        if digits == 0 || !rest.starts_with(&self.delimiter) {
            return Err(FramingError::InvalidLengthEncoding);
        }

        let len = std::str::from_utf8(&field[..digits])
            .ok()
            .and_then(|text| text.parse::<u64>().ok())
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(FramingError::LengthOverflow)?;
        if len > self.max_message_size {
            return Err(FramingError::OversizedFrame {
                size: len,
                max: self.max_message_size,
            });
        }

        let payload_start = self.offset + digits + self.delimiter.len();
        let end = payload_start
            .checked_add(len)
            .ok_or(FramingError::LengthOverflow)?;
        if buf.len() < end {
            return need_more;
        }
        Ok(Extraction::Found(FrameBounds {
            end,
            payload: payload_start..end,
        }))
    }
}
