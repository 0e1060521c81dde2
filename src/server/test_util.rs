//! Test helpers shared across server modules.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::{Mutex, MutexGuard, OnceLock},
};

use logtest::Logger;
use rstest::fixture;
use tokio::sync::mpsc;

use super::{Bound, ProxyConsumer};
use crate::{
    config::{ListenAddress, ProxyConfig},
    message::{Message, StreamId},
    partition::Partitioner,
};

pub type TestSender = mpsc::UnboundedSender<Message>;

/// Both ends of an unbounded message channel.
pub struct TestSink {
    pub sender: TestSender,
    pub receiver: mpsc::UnboundedReceiver<Message>,
}

#[fixture]
pub fn test_sink() -> TestSink {
    let (sender, receiver) = mpsc::unbounded_channel();
    TestSink { sender, receiver }
}

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

/// Newline-delimited configuration listening on `addr`.
pub fn tcp_config(addr: &str) -> ProxyConfig {
    ProxyConfig::new(
        ListenAddress::Tcp(addr.to_owned()),
        Partitioner::delimiter(b"\n".to_vec()).expect("non-empty delimiter"),
        StreamId::from("test"),
    )
}

pub fn bind_server(
    config: ProxyConfig,
    sender: TestSender,
    listener: StdTcpListener,
) -> ProxyConsumer<TestSender, Bound> {
    ProxyConsumer::new(config, sender)
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}

/// Handle to the global logger with exclusive access.
///
/// Serialises log capture between tests; records emitted by tests not
/// holding the handle may still appear.
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

impl std::ops::Deref for LoggerHandle {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LoggerHandle {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
