//! Errors raised by [`ProxyConsumer`](super::ProxyConsumer) operations.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that prevent a consumer from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listening socket failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),

    /// The consumer options were invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
