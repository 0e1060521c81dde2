#![doc(html_root_url = "https://docs.rs/relayframe/latest")]
//! Public API for the `relayframe` library.
//!
//! `relayframe` is the ingestion front-end of a log shipping pipeline. It
//! accepts byte streams on a TCP or Unix socket, splits them into messages
//! with a configurable [`Partitioner`], and hands every message to a
//! [`MessageSink`] tagged with a static routing key. A shared [`Fuse`] pauses
//! accepting and closes active connections while it is burned.

pub mod codec;
pub mod config;
pub mod fuse;
pub mod message;
pub mod metrics;
pub mod partition;
pub mod reader;
pub mod server;

pub use codec::{CodecError, EofError, Frame, FrameDecoder, FramingError};
pub use config::{ConfigError, ConfigProblem, ConsumerOptions, ListenAddress, ProxyConfig};
pub use fuse::{Fuse, FuseMonitor};
pub use message::{Message, MessageSink, SinkError, StreamId};
pub use partition::{Extraction, FrameBounds, Partitioner, PartitionerKind};
pub use reader::{MessageStream, pull};
pub use server::{ProxyConsumer, error::ServerError};
