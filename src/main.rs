//! Demo binary: connect, emit one event, optionally print replies, close.

mod cli;

use std::{error::Error, fs, process::ExitCode};

use clap::Parser;
use pocketio::{Client, EngineOptions, SocketIo};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "pocketio-emit failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn load_options(cli: &cli::Cli) -> Result<EngineOptions, Box<dyn Error>> {
    let mut options = match &cli.options {
        Some(path) => EngineOptions::from_json(&fs::read_to_string(path)?)?,
        None => EngineOptions::default(),
    };
    if let Some(version) = cli.eio {
        options = options.version(version);
    }
    for header in &cli.headers {
        options = options.header(header.clone());
    }
    Ok(options)
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving prometheus metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature; --metrics-addr ignored");
    }
    Ok(())
}

fn run(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    install_metrics(cli)?;
    let options = load_options(cli)?;
    let data: Value = serde_json::from_str(&cli.data)?;

    let mut client = Client::new(SocketIo::new(&cli.url, options)?);
    client.initialize()?;
    if let Some(namespace) = &cli.namespace {
        client.of(namespace)?;
    }
    client.emit(&cli.event, &data)?;
    for _ in 0..cli.read {
        println!("{}", client.read()?);
    }
    client.close()?;
    Ok(())
}
