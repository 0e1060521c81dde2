//! Binary length prefixes used by the `binary` partitioners.
use std::io;

use bytes::BytesMut;

/// Byte order used for encoding and decoding length prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// Width of a binary length prefix. Only 1, 2, 4 and 8 byte prefixes exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthWidth {
    U8,
    U16,
    U32,
    U64,
}

impl LengthWidth {
    /// Map a configured size in bytes to a width.
    ///
    /// Returns `None` for anything other than 1, 2, 4 or 8.
    #[must_use]
    pub fn from_size(size: i64) -> Option<Self> {
        match size {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            8 => Some(Self::U64),
            _ => None,
        }
    }

    /// Number of bytes occupied by the prefix.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

/// Format of a binary length prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthFormat {
    pub width: LengthWidth,
    pub endianness: Endianness,
}

impl LengthFormat {
    #[must_use]
    pub const fn new(width: LengthWidth, endianness: Endianness) -> Self {
        Self { width, endianness }
    }

    /// 4-byte little-endian prefix, the `binary` default.
    #[must_use]
    pub const fn u32_le() -> Self { Self::new(LengthWidth::U32, Endianness::Little) }

    /// 4-byte big-endian prefix, the `binary_be` default.
    #[must_use]
    pub const fn u32_be() -> Self { Self::new(LengthWidth::U32, Endianness::Big) }

    /// Decode the prefix stored at the start of `bytes`.
    ///
    /// Returns `None` while fewer than `width` bytes are available.
    #[must_use]
    pub fn read_len(&self, bytes: &[u8]) -> Option<u64> {
        let prefix = bytes.get(..self.width.bytes())?;
        let mut buf = [0u8; 8];
        let value = match self.endianness {
            Endianness::Big => {
                buf[8 - prefix.len()..].copy_from_slice(prefix);
                u64::from_be_bytes(buf)
            }
            Endianness::Little => {
                buf[..prefix.len()].copy_from_slice(prefix);
                u64::from_le_bytes(buf)
            }
        };
        Some(value)
    }

    /// Append `len` to `dst` using this prefix encoding.
    ///
    /// # Errors
    /// Returns [`io::ErrorKind::InvalidInput`] if `len` does not fit in the
    /// prefix width.
    pub fn write_len(&self, len: usize, dst: &mut BytesMut) -> io::Result<()> {
        let width = self.width.bytes();
        let value = u64::try_from(len)
            .ok()
            .filter(|value| width == 8 || value >> (width * 8) == 0)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "length does not fit prefix")
            })?;
        match self.endianness {
            Endianness::Big => dst.extend_from_slice(&value.to_be_bytes()[8 - width..]),
            Endianness::Little => dst.extend_from_slice(&value.to_le_bytes()[..width]),
        }
        Ok(())
    }
}

impl Default for LengthFormat {
    fn default() -> Self { Self::u32_le() }
}
