//! Consumer configuration.
//!
//! [`ConsumerOptions`] mirrors the recognised option names and is usually
//! deserialised from TOML. [`ConsumerOptions::validate`] checks every option
//! at once and either yields an immutable [`ProxyConfig`] or a
//! [`ConfigError`] listing all problems found. Nothing here opens a socket.

use std::fmt::Write as _;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    message::StreamId,
    partition::{
        DEFAULT_MAX_MESSAGE_SIZE,
        Endianness,
        LengthFormat,
        LengthWidth,
        Partitioner,
        PartitionerKind,
    },
};

mod address;
pub mod escape;

pub use address::ListenAddress;

/// Default `Address`: all interfaces, port 5880.
pub const DEFAULT_ADDRESS: &str = ":5880";
/// Default `Stream` routing key.
pub const DEFAULT_STREAM: &str = "proxy";
/// Default `Size` for the `binary` partitioners.
pub const DEFAULT_BINARY_SIZE: i64 = 4;
/// Default `Size` for the `fixed` partitioner.
pub const DEFAULT_FIXED_SIZE: i64 = 1;

/// Raw consumer options as written in a configuration file.
///
/// # Examples
///
/// ```
/// use relayframe::ConsumerOptions;
///
/// let options: ConsumerOptions = toml::from_str(
///     r#"
///     Address = "127.0.0.1:5880"
///     Partitioner = "binary_be"
///     Size = 2
///     "#,
/// )
/// .expect("valid TOML");
/// let config = options.validate().expect("valid options");
/// assert_eq!(config.stream().as_str(), "proxy");
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct ConsumerOptions {
    pub address: String,
    pub partitioner: String,
    /// Delimiter with backslash escapes, e.g. `\n` or `\x1e`.
    pub delimiter: String,
    pub offset: i64,
    /// Length-field width for `binary*`, message size for `fixed`. Defaults
    /// to 4 and 1 respectively.
    pub size: Option<i64>,
    pub stream: String,
    pub max_message_size: usize,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_owned(),
            partitioner: PartitionerKind::Delimiter.to_string(),
            delimiter: "\n".to_owned(),
            offset: 0,
            size: None,
            stream: DEFAULT_STREAM.to_owned(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// A single invalid option.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigProblem {
    #[error("protocol {0} is not supported")]
    UnsupportedProtocol(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("unknown partitioner: {0}")]
    UnknownPartitioner(String),
    #[error("size {0} is not supported, use 1, 2, 4 or 8")]
    InvalidBinarySize(i64),
    #[error("fixed message size must be positive, got {0}")]
    InvalidFixedSize(i64),
    #[error("offset must not be negative, got {0}")]
    NegativeOffset(i64),
    #[error("delimiter must not be empty")]
    EmptyDelimiter,
    #[error("ascii delimiter must not start with a digit")]
    DigitDelimiter,
    #[error(transparent)]
    InvalidEscape(#[from] escape::EscapeError),
    #[error("maximum message size must be positive")]
    ZeroMaxMessageSize,
    #[error("fixed message size {size} exceeds maximum message size {max}")]
    FixedSizeExceedsMax { size: usize, max: usize },
    #[error("stream name must not be empty")]
    EmptyStream,
}

/// Every problem found while validating [`ConsumerOptions`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid consumer configuration: {}", join_problems(.problems))]
pub struct ConfigError {
    pub problems: Vec<ConfigProblem>,
}

fn join_problems(problems: &[ConfigProblem]) -> String {
    let mut out = String::new();
    for (index, problem) in problems.iter().enumerate() {
        if index > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{problem}");
    }
    out
}

/// Validated, immutable consumer configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    address: ListenAddress,
    partitioner: Partitioner,
    stream: StreamId,
}

impl ProxyConfig {
    #[must_use]
    pub fn new(address: ListenAddress, partitioner: Partitioner, stream: StreamId) -> Self {
        Self {
            address,
            partitioner,
            stream,
        }
    }

    #[must_use]
    pub fn address(&self) -> &ListenAddress { &self.address }

    #[must_use]
    pub fn partitioner(&self) -> &Partitioner { &self.partitioner }

    #[must_use]
    pub fn stream(&self) -> &StreamId { &self.stream }
}

impl ConsumerOptions {
    /// Check every option and build a [`ProxyConfig`].
    ///
    /// # Errors
    /// Returns a [`ConfigError`] holding one [`ConfigProblem`] per invalid
    /// option, in option order.
    pub fn validate(&self) -> Result<ProxyConfig, ConfigError> {
        let mut problems = Vec::new();

        let address = ListenAddress::parse(&self.address)
            .map_err(|problem| problems.push(problem))
            .ok();
        let partitioner = self.build_partitioner(&mut problems);
        if self.stream.is_empty() {
            problems.push(ConfigProblem::EmptyStream);
        }

        match (address, partitioner) {
            (Some(address), Some(partitioner)) if problems.is_empty() => Ok(ProxyConfig::new(
                address,
                partitioner,
                StreamId::from(self.stream.as_str()),
            )),
            _ => Err(ConfigError { problems }),
        }
    }

    fn build_partitioner(&self, problems: &mut Vec<ConfigProblem>) -> Option<Partitioner> {
        let kind = self
            .partitioner
            .parse::<PartitionerKind>()
            .map_err(|err| problems.push(ConfigProblem::UnknownPartitioner(err.0)))
            .ok();
        let delimiter = escape::unescape(&self.delimiter)
            .map_err(|err| problems.push(err.into()))
            .ok();
        let offset = usize::try_from(self.offset)
            .map_err(|_| problems.push(ConfigProblem::NegativeOffset(self.offset)))
            .ok();
        let max = self.max_message_size;
        if max == 0 {
            problems.push(ConfigProblem::ZeroMaxMessageSize);
        }

        let partitioner = match kind? {
            PartitionerKind::Delimiter => Partitioner::delimiter(checked_delimiter(
                delimiter?,
                false,
                problems,
            )?)?,
            PartitionerKind::Ascii => {
                let delimiter = checked_delimiter(delimiter?, true, problems)?;
                Partitioner::ascii(offset?, delimiter)?
            }
            PartitionerKind::Binary | PartitionerKind::BinaryBigEndian => {
                let size = self.size.unwrap_or(DEFAULT_BINARY_SIZE);
                let Some(width) = LengthWidth::from_size(size) else {
                    problems.push(ConfigProblem::InvalidBinarySize(size));
                    return None;
                };
                let endianness = if kind == Some(PartitionerKind::BinaryBigEndian) {
                    Endianness::Big
                } else {
                    Endianness::Little
                };
                Partitioner::binary(offset?, LengthFormat::new(width, endianness))
            }
            PartitionerKind::Fixed => {
                let configured = self.size.unwrap_or(DEFAULT_FIXED_SIZE);
                let Some(size) = usize::try_from(configured).ok().filter(|size| *size > 0) else {
                    problems.push(ConfigProblem::InvalidFixedSize(configured));
                    return None;
                };
                if max > 0 && size > max {
                    problems.push(ConfigProblem::FixedSizeExceedsMax { size, max });
                    return None;
                }
                Partitioner::fixed(size)?
            }
        };
        Some(partitioner.with_max_message_size(max))
    }
}

fn checked_delimiter(
    delimiter: Vec<u8>,
    ascii: bool,
    problems: &mut Vec<ConfigProblem>,
) -> Option<Vec<u8>> {
    match delimiter.first() {
        None => {
            problems.push(ConfigProblem::EmptyDelimiter);
            None
        }
        Some(first) if ascii && first.is_ascii_digit() => {
            problems.push(ConfigProblem::DigitDelimiter);
            None
        }
        Some(_) => Some(delimiter),
    }
}
