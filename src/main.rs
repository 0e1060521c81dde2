//! `relayframe` binary: consume framed streams and print every message.
//!
//! Options come from an optional TOML file with command-line overrides. On
//! Unix, `SIGUSR1` burns the fuse and `SIGUSR2` clears it. Ctrl+C shuts the
//! consumer down.

mod cli;

use std::{error::Error, fs, process::ExitCode};

use clap::Parser;
use log::{error, info, warn};
use relayframe::{ConsumerOptions, Fuse, Message, ProxyConsumer};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt, stdout},
    signal,
    sync::mpsc,
};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // The library only logs; installing the subscriber is left to binaries.
    tracing_subscriber::fmt::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("relayframe failed: error={e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let options = load_options(&cli)?;
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let fuse = Fuse::new();
    spawn_fuse_signals(&fuse)?;

    let (sink, messages) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_messages(messages, stdout()));
    let consumer = ProxyConsumer::from_options(&options, sink)?.with_fuse(fuse.monitor());

    consumer
        .consume(async {
            let _ = signal::ctrl_c().await;
            info!("interrupt received, shutting down");
        })
        .await?;
    printer.await?;
    Ok(())
}

fn load_options(cli: &Cli) -> Result<ConsumerOptions, Box<dyn Error>> {
    let mut options = match &cli.config {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => ConsumerOptions::default(),
    };
    apply_overrides(&mut options, cli);
    Ok(options)
}

fn apply_overrides(options: &mut ConsumerOptions, cli: &Cli) {
    if let Some(address) = &cli.address {
        options.address.clone_from(address);
    }
    if let Some(partitioner) = &cli.partitioner {
        options.partitioner.clone_from(partitioner);
    }
    if let Some(delimiter) = &cli.delimiter {
        options.delimiter.clone_from(delimiter);
    }
    if let Some(offset) = cli.offset {
        options.offset = offset;
    }
    if cli.size.is_some() {
        options.size = cli.size;
    }
    if let Some(stream) = &cli.stream {
        options.stream.clone_from(stream);
    }
    if let Some(max) = cli.max_message_size {
        options.max_message_size = max;
    }
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("serving metrics: address={addr}");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    warn!("metrics support not compiled in, ignoring --metrics-addr: address={addr}");
    Ok(())
}

#[cfg(unix)]
fn spawn_fuse_signals(fuse: &Fuse) -> std::io::Result<()> {
    use signal::unix::{SignalKind, signal};

    let mut burn = signal(SignalKind::user_defined1())?;
    let mut clear = signal(SignalKind::user_defined2())?;
    let fuse = fuse.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = burn.recv() => { fuse.burn(); }
                Some(()) = clear.recv() => { fuse.clear(); }
                else => break,
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_fuse_signals(_fuse: &Fuse) -> std::io::Result<()> { Ok(()) }

async fn print_messages<W>(mut messages: mpsc::UnboundedReceiver<Message>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let written = async {
            out.write_all(message.payload()).await?;
            out.flush().await
        };
        if let Err(e) = written.await {
            warn!("stdout closed, dropping messages: error={e}");
            break;
        }
    }
}
