//! Command line interface for the `relayframe` binary.
//!
//! Every consumer option can be given on the command line; values given here
//! override those read from the configuration file.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `relayframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "relayframe",
    version,
    about = "Accept framed byte streams and print every message"
)]
pub struct Cli {
    /// TOML file holding consumer options.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listen address: `:port`, `host:port`, `tcp://host:port` or `unix://path`.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Frame format: delimiter, ascii, binary, binary_le, binary_be or fixed.
    #[arg(short, long)]
    pub partitioner: Option<String>,

    /// Frame delimiter, backslash escapes allowed.
    #[arg(short, long)]
    pub delimiter: Option<String>,

    /// Bytes preceding the length field.
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,

    /// Length field width for binary formats, frame size for fixed.
    #[arg(long, allow_negative_numbers = true)]
    pub size: Option<i64>,

    /// Routing key attached to every message.
    #[arg(short, long)]
    pub stream: Option<String>,

    /// Largest payload accepted, in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_message_size: Option<usize>,

    /// Serve Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
