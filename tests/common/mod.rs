//! Shared utilities for integration tests.
//!
//! Provides a free-port listener fixture, a helper that runs a consumer in
//! the background, and serialised access to captured `log` records.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::{Mutex, MutexGuard, OnceLock},
};

use logtest::Logger;
use relayframe::{ConsumerOptions, FuseMonitor, Message, ProxyConsumer, ServerError};
use rstest::fixture;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Duration, timeout},
};

/// Create a TCP listener bound to a free local port.
#[fixture]
pub fn unused_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("failed to bind port")
}

/// A consumer running on a background task.
pub struct RunningConsumer {
    pub addr: Option<SocketAddr>,
    pub messages: mpsc::UnboundedReceiver<Message>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningConsumer {
    /// Wait for the next routed message.
    pub async fn next_message(&mut self) -> Message {
        timeout(Duration::from_secs(2), self.messages.recv())
            .await
            .expect("message in time")
            .expect("sink open")
    }

    /// Assert nothing reaches the sink within `wait`.
    pub async fn assert_silent(&mut self, wait: Duration) {
        if let Ok(Some(message)) = timeout(wait, self.messages.recv()).await {
            panic!("unexpected message: {:?}", message.payload());
        }
    }

    /// Trigger shutdown and wait for the consumer to return.
    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.stop.send(());
        timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("consumer stopped in time")
            .expect("consumer task")
    }
}

/// Run a consumer for `options` on an already bound TCP listener.
pub async fn start_on_listener(
    options: &ConsumerOptions,
    listener: StdTcpListener,
    fuse: FuseMonitor,
) -> RunningConsumer {
    let (sink, messages) = mpsc::unbounded_channel();
    let consumer = ProxyConsumer::from_options(options, sink)
        .expect("valid options")
        .with_fuse(fuse)
        .bind_existing_listener(listener)
        .expect("adopt listener");
    spawn(consumer.local_addr(), messages, |ready, stop| {
        tokio::spawn(consumer.ready_signal(ready).run_with_shutdown(async {
            let _ = stop.await;
        }))
    })
    .await
}

/// Run a consumer that binds `options.address` itself.
pub async fn start(options: &ConsumerOptions) -> RunningConsumer {
    let (sink, messages) = mpsc::unbounded_channel();
    let consumer = ProxyConsumer::from_options(options, sink).expect("valid options");
    spawn(None, messages, |ready, stop| {
        tokio::spawn(consumer.ready_signal(ready).consume(async {
            let _ = stop.await;
        }))
    })
    .await
}

async fn spawn<F>(
    addr: Option<SocketAddr>,
    messages: mpsc::UnboundedReceiver<Message>,
    run: F,
) -> RunningConsumer
where
    F: FnOnce(oneshot::Sender<()>, oneshot::Receiver<()>) -> JoinHandle<Result<(), ServerError>>,
{
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop, stop_rx) = oneshot::channel();
    let handle = run(ready_tx, stop_rx);
    timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("consumer ready in time")
        .expect("ready signal");
    RunningConsumer {
        addr,
        messages,
        stop,
        handle,
    }
}

/// Options for a newline-delimited consumer on `address`.
pub fn delimited(address: &str) -> ConsumerOptions {
    ConsumerOptions {
        address: address.to_owned(),
        stream: "it".to_owned(),
        ..ConsumerOptions::default()
    }
}

/// Handle to the global logger with exclusive access.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let mut guard = logger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while guard.pop().is_some() {}

        Self { guard }
    }

    /// Whether any captured record contains `needle`, draining the capture.
    pub fn contains(&mut self, needle: &str) -> bool {
        let mut found = false;
        while let Some(record) = self.guard.pop() {
            found |= record.args().to_string().contains(needle);
        }
        found
    }
}

#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
