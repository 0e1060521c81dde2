//! Messages and the routing sink they are delivered to.
//!
//! A [`Message`] is produced for every complete frame and handed to a
//! [`MessageSink`] together with the consumer's static routing key. The
//! engine keeps no reference to a message once the sink has accepted it.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Routing key assigned to a consumer at configuration time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(Arc<str>);

impl StreamId {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self { Self(name.into()) }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for StreamId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for StreamId {
    fn from(value: String) -> Self { Self::new(value) }
}

/// An immutable framed payload tagged with its routing key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    stream: StreamId,
}

impl Message {
    #[must_use]
    pub fn new(payload: Bytes, stream: StreamId) -> Self { Self { payload, stream } }

    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    #[must_use]
    pub fn stream(&self) -> &StreamId { &self.stream }

    /// Split the message into its payload and routing key.
    #[must_use]
    pub fn into_parts(self) -> (Bytes, StreamId) { (self.payload, self.stream) }
}

/// Errors reported by a [`MessageSink`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The downstream consumer has gone away.
    #[error("message sink closed")]
    Closed,
}

/// Downstream destination for framed messages.
///
/// Connection handlers call [`route`](MessageSink::route) once per message,
/// in frame order. A sink may apply backpressure by not resolving until it
/// has capacity.
#[async_trait]
pub trait MessageSink: Send + Sync + 'static {
    /// Deliver `message` downstream.
    ///
    /// # Errors
    /// Returns [`SinkError::Closed`] when the sink can no longer accept
    /// messages. The calling connection is closed.
    async fn route(&self, message: Message) -> Result<(), SinkError>;
}

#[async_trait]
impl MessageSink for mpsc::Sender<Message> {
    async fn route(&self, message: Message) -> Result<(), SinkError> {
        self.send(message).await.map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl MessageSink for mpsc::UnboundedSender<Message> {
    async fn route(&self, message: Message) -> Result<(), SinkError> {
        self.send(message).map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl<S: MessageSink> MessageSink for Arc<S> {
    async fn route(&self, message: Message) -> Result<(), SinkError> {
        self.as_ref().route(message).await
    }
}
