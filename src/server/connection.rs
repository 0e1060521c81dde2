//! Connection handling for [`ProxyConsumer`](super::ProxyConsumer).
//!
//! Each accepted connection runs in its own task. The handler pulls messages
//! off the socket and routes them until the peer closes, the stream turns out
//! to be malformed, the fuse burns, or the consumer shuts down. Buffered bytes
//! that never completed a frame are discarded.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::{io::AsyncRead, select};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::listener::Accepted;
use crate::{
    codec::{CodecError, EofError},
    config::ProxyConfig,
    fuse::FuseMonitor,
    message::{MessageSink, StreamId},
    metrics::{self, ErrorKind},
    partition::Partitioner,
    reader::MessageStream,
};

/// Everything a connection handler needs, shared by all connections.
pub(crate) struct ConnectionContext<K> {
    pub sink: Arc<K>,
    pub partitioner: Partitioner,
    pub stream: StreamId,
    pub fuse: FuseMonitor,
    /// Cancelled once the consumer is no longer active.
    pub shutdown: CancellationToken,
}

impl<K> Clone for ConnectionContext<K> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            partitioner: self.partitioner.clone(),
            stream: self.stream.clone(),
            fuse: self.fuse.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<K> ConnectionContext<K> {
    pub(crate) fn new(
        config: &ProxyConfig,
        sink: Arc<K>,
        fuse: FuseMonitor,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sink,
            partitioner: config.partitioner().clone(),
            stream: config.stream().clone(),
            fuse,
            shutdown,
        }
    }
}

/// Why a connection handler stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionOutcome {
    /// The consumer shut down.
    Shutdown,
    /// The fuse burned.
    FuseBurned,
    /// The peer closed the connection.
    PeerClosed,
    /// The peer declared a frame that can never be valid.
    Malformed,
    /// Reading from the connection failed.
    ReadError,
    /// The sink stopped accepting messages.
    SinkClosed,
}

/// Spawn a task to process a single connection, logging and discarding any panics.
pub(crate) fn spawn_connection_task<K>(
    accepted: Accepted,
    ctx: ConnectionContext<K>,
    tracker: &TaskTracker,
) where
    K: MessageSink,
{
    let Accepted { stream, peer } = accepted;
    tracker.spawn(async move {
        metrics::inc_connections();
        let fut = AssertUnwindSafe(handle_connection(stream, &peer, ctx)).catch_unwind();

        match fut.await {
            Ok(outcome) => debug!("connection closed: peer={peer}, outcome={outcome:?}"),
            Err(panic) => {
                metrics::inc_connection_panics();
                let panic_msg = panic_message(panic.as_ref());
                // Emit via both `log` and `tracing` for tests that capture either.
                error!("connection task panicked: panic={panic_msg}, peer={peer}");
                tracing::error!(panic = %panic_msg, %peer, "connection task panicked");
            }
        }
        metrics::dec_connections();
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        format!("{panic:?}")
    }
}

/// Read messages from `source` and route them until the connection ends.
pub(crate) async fn handle_connection<R, K>(
    source: R,
    peer: &str,
    ctx: ConnectionContext<K>,
) -> ConnectionOutcome
where
    R: AsyncRead + Unpin,
    K: MessageSink,
{
    debug!("connection opened: peer={peer}, stream={}", ctx.stream);
    let ConnectionContext {
        sink,
        partitioner,
        stream,
        fuse,
        shutdown,
    } = ctx;
    let mut messages = MessageStream::new(source, partitioner, stream);

    loop {
        let item = select! {
            biased;

            () = shutdown.cancelled() => {
                return discard_buffered(&messages, peer, ConnectionOutcome::Shutdown);
            }
            () = fuse.wait_until_burned() => {
                return discard_buffered(&messages, peer, ConnectionOutcome::FuseBurned);
            }
            item = messages.next() => item,
        };

        let message = match item {
            None => return ConnectionOutcome::PeerClosed,
            Some(Ok(message)) => message,
            Some(Err(CodecError::Eof(EofError::TrailingData { bytes }))) => {
                error!("discarding incomplete frame at end of stream: peer={peer}, bytes={bytes}");
                metrics::inc_errors(ErrorKind::TrailingData);
                return ConnectionOutcome::PeerClosed;
            }
            Some(Err(e)) if e.is_malformed() => {
                error!("malformed frame, closing connection: peer={peer}, error={e}");
                metrics::inc_errors(ErrorKind::Framing);
                return ConnectionOutcome::Malformed;
            }
            Some(Err(e)) => {
                if !shutdown.is_cancelled() {
                    warn!("connection read failed: peer={peer}, error={e}");
                }
                metrics::inc_errors(ErrorKind::Io);
                return ConnectionOutcome::ReadError;
            }
        };

        let routed = select! {
            biased;

            () = shutdown.cancelled() => {
                return discard_buffered(&messages, peer, ConnectionOutcome::Shutdown);
            }
            () = fuse.wait_until_burned() => {
                return discard_buffered(&messages, peer, ConnectionOutcome::FuseBurned);
            }
            routed = sink.route(message) => routed,
        };
        if let Err(e) = routed {
            warn!("closing connection: peer={peer}, error={e}");
            metrics::inc_errors(ErrorKind::Sink);
            return ConnectionOutcome::SinkClosed;
        }
        metrics::inc_messages();
    }
}

fn discard_buffered<R>(
    messages: &MessageStream<R>,
    peer: &str,
    outcome: ConnectionOutcome,
) -> ConnectionOutcome
where
    R: AsyncRead + Unpin,
{
    let bytes = messages.buffered_len();
    if bytes > 0 {
        info!("discarding buffered bytes: peer={peer}, bytes={bytes}, outcome={outcome:?}");
    }
    outcome
}
