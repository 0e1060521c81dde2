//! Configuration utilities for [`ProxyConsumer`].

use std::sync::Arc;

use tokio::sync::oneshot;

use super::{ProxyConsumer, ServerState, Unbound};
use crate::{
    config::{ConsumerOptions, ProxyConfig},
    fuse::FuseMonitor,
    message::MessageSink,
    server::ServerError,
};

pub mod binding;


impl<K> ProxyConsumer<K, Unbound>
where
    K: MessageSink,
{
    /// Create a consumer from a validated configuration.
    ///
    /// The consumer starts without a fuse; attach one with
    /// [`with_fuse`](Self::with_fuse). Call [`bind`](Self::bind) before running.
    #[must_use]
    pub fn new(config: ProxyConfig, sink: K) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            fuse: FuseMonitor::never_burned(),
            ready_tx: None,
            state: Unbound,
        }
    }

    /// Validate `options` and create a consumer from them.
    ///
    /// # Errors
    /// Returns [`ServerError::Config`] listing every invalid option. No
    /// socket is opened.
    pub fn from_options(options: &ConsumerOptions, sink: K) -> Result<Self, ServerError> {
        Ok(Self::new(options.validate()?, sink))
    }
}

impl<K, S> ProxyConsumer<K, S>
where
    K: MessageSink,
    S: ServerState,
{
    /// Observe `fuse` to pause accepting and close connections while burned.
    #[must_use]
    pub fn with_fuse(mut self, fuse: FuseMonitor) -> Self {
        self.fuse = fuse;
        self
    }

    /// Configure a channel used to signal when the acceptor is running.
    ///
    /// The signal fires once, after the acceptor task has been spawned and
    /// before the consumer starts waiting for shutdown.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// The validated configuration this consumer runs with.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig { &self.config }
}
