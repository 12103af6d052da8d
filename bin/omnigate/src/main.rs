//! omnigate daemon
//!
//! Unified blockchain gateway: one HTTP facade over per-chain adapters.

use clap::Parser;
use omni_chains::ChainRegistry;
use omni_gateway::adapter::ChainAdapter;
use omni_gateway::eth::EthAdapter;
use omni_gateway::trx::TrxAdapter;
use omni_gateway::{ChainRouter, GatewayApi, GatewayConfig};
use omni_model::ChainId;
use std::path::PathBuf;
use std::sync::Arc;

/// omnigate command line arguments
#[derive(Debug, Parser)]
#[clap(name = "omnigate", about = "omnigate - unified blockchain gateway")]
struct Cli {
    /// Configuration file
    #[clap(long, short = 'c')]
    config: PathBuf,

    /// Host and port to listen on
    #[clap(long, short = 'L', default_value = "0.0.0.0:8660")]
    listen: String,

    /// Log level
    #[clap(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level)?;

    let registry = ChainRegistry::default();
    tracing::info!("Supported chains: {:?}", registry.codes());

    let config = GatewayConfig::load(&cli.config)?;

    let mut router = ChainRouter::new();
    for (chain_type, type_config) in &config.chains {
        for (network, network_config) in &type_config.networks {
            let chain = ChainId::new(chain_type.clone(), network.clone());
            let adapter: Arc<dyn ChainAdapter> = if chain.chain_type == omni_chains::trx::CODE {
                Arc::new(TrxAdapter::init(&registry, chain, network_config.clone()).await?)
            } else {
                Arc::new(EthAdapter::init(&registry, chain, network_config.clone()).await?)
            };
            tracing::info!("Chain adapter ready: {}", adapter.chain_id());
            router.insert(adapter);
        }
    }
    if router.is_empty() {
        eyre::bail!("no chains configured");
    }

    let app = GatewayApi::new(Arc::new(router)).routes();
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(level: &str) -> eyre::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
