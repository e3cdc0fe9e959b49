use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use onionmesh_core::config::Config;
use onionmesh_core::logging::{init_logging_with_config, LogConfig};
use onionmesh_core::shutdown::install_signal_handlers;
use onionmesh_core::{NodeId, UserId, Network};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "onionmesh")]
#[command(author, version, about = "Minimal onion-routing overlay", long_about = None)]
struct Args {
    /// TOML configuration file; ONIONMESH_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a directory, relays 0..N and users 0..M in this process
    Network {
        #[arg(long, default_value_t = 3)]
        relays: NodeId,

        #[arg(long, default_value_t = 2)]
        users: UserId,
    },
    /// Run only the directory
    Directory,
    /// Run one relay; it registers with the configured directory
    Relay {
        #[arg(long)]
        id: NodeId,
    },
    /// Run one user node
    User {
        #[arg(long)]
        id: UserId,
    },
    /// Ask a running user node to send a message
    Send {
        #[arg(long)]
        from: UserId,

        #[arg(long)]
        to: UserId,

        message: String,
    },
    /// Write the effective configuration (file, environment and flags) as TOML
    WriteConfig {
        path: PathBuf,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if matches!(args.command, Command::Network { .. }) {
        config.relay.expose_private_key = true;
    }

    config.validate()?;
    Ok(config)
}

fn install_metrics(config: &Config) -> Result<()> {
    onionmesh_core::metrics::init_metrics();
    if !config.metrics.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.metrics.bind_address)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!(address = %config.metrics.bind_address, "Prometheus exporter listening");
    Ok(())
}

/// Serve until SIGINT/SIGTERM, then drain
async fn serve(network: Network) -> Result<()> {
    let coordinator = network.shutdown_coordinator();
    install_signal_handlers(coordinator.clone());

    info!("Running, press Ctrl+C to stop");
    coordinator.wait_for_shutdown().await;
    network.shutdown().await
}

async fn send(config: &Config, from: UserId, to: UserId, message: String) -> Result<()> {
    let port = config.network.address_space().user_port(from)?;
    let url = format!("http://{}/sendMessage", config.network.socket_address(port));

    let response = reqwest::Client::builder()
        .no_proxy()
        .build()?
        .post(&url)
        .json(&json!({ "message": message, "destinationUserId": to }))
        .send()
        .await
        .with_context(|| format!("user {} is not reachable at {}", from, url))?;

    let status = response.status();
    let body: Value = response.json().await?;
    if !status.is_success() {
        bail!("send failed ({}): {}", status, body);
    }

    println!("{}", body);
    Ok(())
}

fn write_config(config: &Config, path: &Path) -> Result<()> {
    config
        .save_to_file(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Configuration written");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    install_metrics(&config)?;

    match args.command {
        Command::Network { relays, users } => {
            let relay_ids: Vec<NodeId> = (0..relays).collect();
            let user_ids: Vec<UserId> = (0..users).collect();
            let network = Network::launch(config, &relay_ids, &user_ids).await?;
            serve(network).await
        }
        Command::Directory => {
            let mut network = Network::new(config)?;
            network.launch_directory().await?;
            serve(network).await
        }
        Command::Relay { id } => {
            let mut network = Network::new(config)?;
            network.launch_relay(id).await?;
            serve(network).await
        }
        Command::User { id } => {
            let mut network = Network::new(config)?;
            network.launch_user(id).await?;
            serve(network).await
        }
        Command::Send { from, to, message } => send(&config, from, to, message).await,
        Command::WriteConfig { path } => write_config(&config, &path),
    }
}
