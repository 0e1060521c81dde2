//! Fixed-size messages.

use std::num::NonZeroUsize;

use super::{Extraction, FrameBounds};

/// Cuts the stream into messages of exactly `size` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPartitioner {
    size: NonZeroUsize,
}

impl FixedPartitioner {
    /// Returns `None` if `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Option<Self> { NonZeroUsize::new(size).map(|size| Self { size }) }

    #[must_use]
    pub const fn size(&self) -> usize { self.size.get() }

    pub(super) fn try_extract(self, buf: &[u8]) -> Extraction {
        let size = self.size.get();
        if buf.len() < size {
            return Extraction::NeedMoreData { resume_at: 0 };
        }
        Extraction::Found(FrameBounds {
            end: size,
            payload: 0..size,
        })
    }
}
