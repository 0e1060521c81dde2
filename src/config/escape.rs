//! Escape-sequence decoding for delimiter options.

use thiserror::Error;

/// A backslash sequence that could not be decoded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid escape sequence: {sequence}")]
pub struct EscapeError {
    pub sequence: String,
}

/// Decode `\n`, `\r`, `\t`, `\0`, `\\`, `\"`, `\'` and `\xHH` in `text`.
///
/// Any other character is kept as its UTF-8 encoding.
///
/// # Errors
/// Returns an [`EscapeError`] naming the first sequence that is not one of
/// the above, including a trailing lone backslash.
pub fn unescape(text: &str) -> Result<Vec<u8>, EscapeError> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut utf8 = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            continue;
        }
        let byte = match chars.next() {
            Some('n') => b'\n',
            Some('r') => b'\r',
            Some('t') => b'\t',
            Some('0') => b'\0',
            Some('\\') => b'\\',
            Some('"') => b'"',
            Some('\'') => b'\'',
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                        byte
                    }
                    _ => {
                        return Err(EscapeError {
                            sequence: format!("\\x{hex}"),
                        });
                    }
                }
            }
            Some(other) => {
                return Err(EscapeError {
                    sequence: format!("\\{other}"),
                });
            }
            None => {
                return Err(EscapeError {
                    sequence: "\\".to_owned(),
                });
            }
        };
        out.push(byte);
    }
    Ok(out)
}
