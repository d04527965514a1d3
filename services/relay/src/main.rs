//! `proxystore-relay` binary: serves a relay given a config path or CLI
//! flags (spec §6). Exit code 0 on success, 1 on any user-facing failure.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use proxystore_config::RelayConfig;
use proxystore_relay::{build_state, serve};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "proxystore-relay", version, about = "ProxyStore WebRTC signaling relay")]
struct Cli {
    /// Path to a relay config TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's bind host.
    #[arg(long)]
    host: Option<String>,

    /// Overrides the config's bind port.
    #[arg(long)]
    port: Option<u32>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match RelayConfig::read_from(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "failed to load relay config");
                return ExitCode::FAILURE;
            }
        },
        None => RelayConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid relay config");
        return ExitCode::FAILURE;
    }

    let addr: SocketAddr = match config.host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, config.port as u16),
        Err(e) => {
            tracing::error!(error = %e, host = %config.host, "invalid bind host");
            return ExitCode::FAILURE;
        }
    };

    let state = build_state(&config);
    match serve(addr, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "relay server exited with an error");
            ExitCode::FAILURE
        }
    }
}
