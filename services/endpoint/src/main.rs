//! `proxystore-endpoint` binary: `{configure,list,remove,start,stop,help,
//! version}` over the persisted state layout of spec §6. Exit code 0 on
//! success, 1 on any user-facing failure.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use proxystore_config::paths;
use proxystore_config::EndpointConfig;
use proxystore_endpoint::{build_state, serve};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "proxystore-endpoint", version, about = "ProxyStore peer-to-peer endpoint daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new endpoint's config.toml under $PROXYSTORE_HOME.
    Configure {
        name: String,
        #[arg(long)]
        port: u32,
        #[arg(long)]
        relay_address: Option<String>,
        #[arg(long)]
        database_path: Option<std::path::PathBuf>,
        #[arg(long)]
        max_object_size: Option<u64>,
    },
    /// List every configured endpoint's name.
    List,
    /// Remove a configured endpoint's state directory.
    Remove { name: String },
    /// Run the daemon for a configured endpoint in the foreground.
    Start { name: String },
    /// Request a running daemon to shut down.
    Stop { name: String },
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

    match cli.command {
        Command::Configure { name, port, relay_address, database_path, max_object_size } => {
            configure(&name, port, relay_address, database_path, max_object_size)
        }
        Command::List => list(),
        Command::Remove { name } => remove(&name),
        Command::Start { name } => start(&name).await,
        Command::Stop { name } => stop(&name),
    }
}

fn configure(
    name: &str,
    port: u32,
    relay_address: Option<String>,
    database_path: Option<std::path::PathBuf>,
    max_object_size: Option<u64>,
) -> ExitCode {
    let config = EndpointConfig {
        name: name.to_string(),
        uuid: Uuid::new_v4(),
        host: "127.0.0.1".to_string(),
        port,
        relay: proxystore_config::EndpointRelayConfig {
            address: relay_address,
            peer_channels: 1,
            verify_certificate: true,
            auth: None,
        },
        storage: proxystore_config::EndpointStorageConfig { database_path, max_object_size },
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid endpoint configuration");
        return ExitCode::FAILURE;
    }
    match config.write_to(&paths::config_path(name)) {
        Ok(()) => {
            println!("configured endpoint {name} ({})", config.uuid);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to write endpoint config");
            ExitCode::FAILURE
        }
    }
}

fn list() -> ExitCode {
    match paths::list_endpoint_names() {
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to list endpoints");
            ExitCode::FAILURE
        }
    }
}

fn remove(name: &str) -> ExitCode {
    let dir = paths::endpoint_dir(name);
    if !dir.exists() {
        tracing::error!(%name, "no such endpoint");
        return ExitCode::FAILURE;
    }
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, %name, "failed to remove endpoint state");
            ExitCode::FAILURE
        }
    }
}

async fn start(name: &str) -> ExitCode {
    let config = match EndpointConfig::read_from(&paths::config_path(name)) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, %name, "failed to load endpoint config");
            return ExitCode::FAILURE;
        }
    };

    let addr: SocketAddr = match config.host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, config.port as u16),
        Err(e) => {
            tracing::error!(error = %e, host = %config.host, "invalid bind host");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(paths::pid_path(name), std::process::id().to_string()) {
        tracing::warn!(error = %e, "failed to write daemon.pid");
    }

    let state = match build_state(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to build endpoint state");
            return ExitCode::FAILURE;
        }
    };

    let result = serve(addr, state).await;
    let _ = std::fs::remove_file(paths::pid_path(name));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "endpoint server exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn stop(name: &str) -> ExitCode {
    let pid_path = paths::pid_path(name);
    let Ok(contents) = std::fs::read_to_string(&pid_path) else {
        tracing::error!(%name, "no running daemon found (no daemon.pid)");
        return ExitCode::FAILURE;
    };
    let Ok(pid) = contents.trim().parse::<i32>() else {
        tracing::error!(%name, "daemon.pid does not contain a valid pid");
        return ExitCode::FAILURE;
    };

    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status();
        match status {
            Ok(s) if s.success() => ExitCode::SUCCESS,
            _ => {
                tracing::error!(%name, pid, "failed to signal daemon");
                ExitCode::FAILURE
            }
        }
    }
    #[cfg(not(unix))]
    {
        tracing::error!("stopping a daemon by pid is only supported on unix");
        ExitCode::FAILURE
    }
}
