//! Command line interface for the `pocketio-emit` binary.
//!
//! Also compiled by the build script to render the man page, so it may only
//! depend on `clap` and `std`.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `pocketio-emit` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pocketio-emit",
    version,
    about = "Connect to a Socket.IO server, emit one event and disconnect"
)]
pub struct Cli {
    /// Server URL, for example `http://localhost:1337`.
    pub url: String,

    /// Event name to emit.
    #[arg(short, long, default_value = "broadcast")]
    pub event: String,

    /// JSON arguments sent with the event.
    #[arg(short, long, default_value = "{}")]
    pub data: String,

    /// Namespace to join before emitting.
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Extra `Name: value` header for the handshake request.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// JSON file with engine options.
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Engine.IO protocol version, overriding the options file.
    #[arg(long)]
    pub eio: Option<u8>,

    /// Frames to read and print after emitting.
    #[arg(short, long, default_value_t = 0)]
    pub read: usize,

    /// Serve Prometheus metrics on this address while running.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
