//! Listener binding for [`ProxyConsumer`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use log::error;

use super::{ProxyConsumer, ServerState, Unbound};
use crate::{
    message::MessageSink,
    server::{Bound, ServerError, listener::Listener},
};

impl<K, S> ProxyConsumer<K, S>
where
    K: MessageSink,
    S: ServerState,
{
    fn with_listener(self, listener: Listener) -> ProxyConsumer<K, Bound> {
        let ProxyConsumer {
            config,
            sink,
            fuse,
            ready_tx,
            ..
        } = self;
        ProxyConsumer {
            config,
            sink,
            fuse,
            ready_tx,
            state: Bound {
                listener: Arc::new(listener),
            },
        }
    }
}

impl<K> ProxyConsumer<K, Unbound>
where
    K: MessageSink,
{
    /// Returns `None` as no listener is bound yet.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Bind the configured address. Must be called from within a Tokio
    /// runtime.
    ///
    /// A stale Unix socket file at the configured path is replaced.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the socket cannot be bound. The
    /// failure is also logged.
    pub fn bind(self) -> Result<ProxyConsumer<K, Bound>, ServerError> {
        let address = self.config.address();
        match Listener::bind(address) {
            Ok(listener) => Ok(self.with_listener(listener)),
            Err(e) => {
                error!("bind failed: address={address}, error={e}");
                Err(ServerError::Bind(e))
            }
        }
    }

    /// Adopt an already bound TCP listener instead of the configured address.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the listener cannot be registered
    /// with the runtime.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<ProxyConsumer<K, Bound>, ServerError> {
        let listener = Listener::from_std(std_listener).map_err(ServerError::Bind)?;
        Ok(self.with_listener(listener))
    }
}

impl<K> ProxyConsumer<K, Bound>
where
    K: MessageSink,
{
    /// The bound TCP address, or `None` for Unix socket listeners.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.tcp_addr() }
}
