//! Tokio-based proxy consumer.
//!
//! [`ProxyConsumer`] owns the listening socket. It runs an acceptor task that
//! spawns one handler task per connection, each of which reads messages with
//! the configured [`Partitioner`](crate::partition::Partitioner) and routes
//! them to a [`MessageSink`]. A [`FuseMonitor`] pauses accepting and closes
//! active connections while the fuse is burned.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::{config::ProxyConfig, fuse::FuseMonitor, message::MessageSink};

/// Listener-owning consumer that frames byte streams into messages.
///
/// The `S` type parameter tracks whether a listener has been bound; only a
/// [`Bound`] consumer can run.
///
/// # Examples
///
/// ```no_run
/// use relayframe::{ConsumerOptions, Message, ProxyConsumer, ServerError};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ServerError> {
/// let (tx, mut rx) = mpsc::channel::<Message>(1024);
/// tokio::spawn(async move {
///     while let Some(message) = rx.recv().await {
///         println!("{message:?}");
///     }
/// });
/// let consumer = ProxyConsumer::from_options(&ConsumerOptions::default(), tx)?;
/// consumer.bind()?.run().await
/// # }
/// ```
pub struct ProxyConsumer<K, S = Unbound>
where
    K: MessageSink,
    S: ServerState,
{
    pub(crate) config: ProxyConfig,
    pub(crate) sink: Arc<K>,
    pub(crate) fuse: FuseMonitor,
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) state: S,
}

/// Marker indicating the consumer has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the consumer owns a bound listener.
#[derive(Debug)]
pub struct Bound {
    pub(crate) listener: Arc<listener::Listener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
pub use config::binding;
mod connection;
pub mod error;
mod listener;
mod runtime;

pub use error::ServerError;

#[cfg(test)]
pub(crate) mod test_util;
