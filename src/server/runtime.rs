//! Runtime control for [`ProxyConsumer`].

mod accept;

use std::sync::Arc;

pub(super) use accept::{AcceptLoopOptions, accept_loop};
use futures::Future;
use log::{info, warn};
use tokio::{select, signal, task::JoinError};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    Bound,
    ProxyConsumer,
    ServerError,
    Unbound,
    connection::ConnectionContext,
    listener::ListenerHandle,
};
use crate::message::MessageSink;

impl<K> ProxyConsumer<K, Unbound>
where
    K: MessageSink,
{
    /// Bind the configured address and run until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] without entering the accept loop if the
    /// listener cannot be bound.
    pub async fn consume<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        self.bind()?.run_with_shutdown(shutdown).await
    }
}

impl<K> ProxyConsumer<K, Bound>
where
    K: MessageSink,
{
    /// Run the consumer until Ctrl+C is received.
    ///
    /// # Errors
    ///
    /// Currently never fails once bound; the `Result` leaves room for
    /// runtime failures.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the consumer until the `shutdown` future resolves.
    ///
    /// Spawns the acceptor, fires the ready signal, then waits for
    /// `shutdown`. On shutdown the consumer is marked inactive, the listener
    /// is closed, and the call returns only after the acceptor and every
    /// connection task have finished. An acceptor that stops early, for
    /// example after an accept error, leaves existing connections running
    /// until shutdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use relayframe::{ConsumerOptions, Message, ProxyConsumer, ServerError};
    /// use tokio::sync::{mpsc, oneshot};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ServerError> {
    /// let options = ConsumerOptions {
    ///     address: "127.0.0.1:0".into(),
    ///     ..ConsumerOptions::default()
    /// };
    /// let (sink, _messages) = mpsc::unbounded_channel::<Message>();
    /// let consumer = ProxyConsumer::from_options(&options, sink)?.bind()?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(consumer.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    ///
    /// let _ = tx.send(());
    /// handle.await.expect("join consumer task")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Currently never fails once bound; the `Result` leaves room for
    /// runtime failures.
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let ProxyConsumer {
            config,
            sink,
            fuse,
            ready_tx,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let handle = ListenerHandle::new(Arc::clone(&listener));
        let ctx = ConnectionContext::new(&config, sink, fuse, shutdown_token.clone());

        let mut acceptor = tracker.spawn(accept_loop(handle.clone(), AcceptLoopOptions {
            ctx,
            tracker: tracker.clone(),
        }));
        info!(
            "consumer started: address={}, partitioner={}, stream={}",
            config.address(),
            config.partitioner().kind(),
            config.stream()
        );

        // Signal readiness once the acceptor has been spawned.
        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        tokio::pin!(shutdown);
        let stopped_early = select! {
            biased;

            () = &mut shutdown => None,
            res = &mut acceptor => Some(res),
        };
        let acceptor_finished = stopped_early.is_some();
        if let Some(res) = stopped_early {
            report_acceptor_exit(res);
            warn!("acceptor stopped before shutdown: address={}", config.address());
            shutdown.await;
        }

        shutdown_token.cancel();
        handle.close();
        if !acceptor_finished {
            report_acceptor_exit(acceptor.await);
        }

        tracker.close();
        tracker.wait().await;
        drop(handle);
        drop(listener);
        info!("consumer stopped: address={}", config.address());
        Ok(())
    }
}

fn report_acceptor_exit(res: Result<(), JoinError>) {
    if let Err(e) = res {
        warn!("acceptor task failed: error={e}");
    }
}
