#![forbid(unsafe_code)]
//! Chainlet ledger node: loads configuration, registers bootstrap peers and
//! serves the HTTP API.

use chainlet::api::run_api_server;
use chainlet::config::{load_config, DEFAULT_CONFIG_PATH};
use chainlet::node::Node;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address to bind the API to (overrides network.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides network.api_port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Leading zero hex digits required of a proof (overrides miner.difficulty)
    #[arg(long)]
    difficulty: Option<u32>,

    /// Peer to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;

    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.api_port = port;
    }
    if let Some(difficulty) = args.difficulty {
        config.miner.difficulty = difficulty;
    }
    config.network.bootstrap_peers.extend(args.peers);

    let node = Arc::new(Node::new(&config)?);
    info!(
        node_id = %node.node_id(),
        difficulty = config.miner.difficulty,
        "starting Chainlet node"
    );

    if !config.network.bootstrap_peers.is_empty() {
        match node.register_peers(&config.network.bootstrap_peers).await {
            Ok(peers) => info!(count = peers.len(), "bootstrap peers registered"),
            Err(e) => warn!(error = %e, "ignoring bootstrap peers"),
        }
    }

    run_api_server(node, &config.network.host, config.network.api_port).await?;
    Ok(())
}
