mod app;
mod cli;
mod config;

use app::CosignNode;
use clap::Parser;
use cli::{Cli, Commands};
use crate::config::AppConfig;
use cosign_storage::{Pruner, SignatureStore, SqliteSignatureStore};
use cosign_types::TxIdentity;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        eprintln!("cosign-node: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    config.apply_overrides(&cli.overrides);

    init_tracing(&config.logging.level, &config.logging.format);

    match cli.command {
        Some(Commands::Run) | None => {
            run_node(config).await?;
        }
        Some(Commands::Status { tx }) => {
            query_status(config, &tx).await?;
        }
        Some(Commands::Prune { older_than_hours }) => {
            prune(config, older_than_hours).await?;
        }
        Some(Commands::Info) => {
            show_info(&config)?;
        }
    }

    Ok(())
}

async fn run_node(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting co-signing node");
    info!("  Horizon:     {}", config.ledger.horizon_url);
    info!("  Store:       {}", config.storage.db_path);
    info!("  Topic:       {}", config.network.topic);
    info!("  P2P listen:  {}", config.node.p2p_listen_addr);
    info!("  HTTP listen: {}", config.node.http_listen_addr);

    let node = CosignNode::new(config)?;
    node.run().await?;

    Ok(())
}

async fn query_status(config: AppConfig, tx: &str) -> anyhow::Result<()> {
    let identity: TxIdentity = tx.parse()?;
    let store = SqliteSignatureStore::open(&config.storage.db_path)?;

    println!("\nTransaction Status");
    println!("-------------------------------------");
    println!("  TX:          {}", identity);

    match store.get(&identity).await? {
        Some(envelope) => {
            println!("  Signatures:  {}", envelope.signature_count());
            for signature in envelope.signatures() {
                println!("    hint {}", hex::encode(signature.hint.0));
            }
        }
        None => println!("  Signatures:  none seen"),
    }

    Ok(())
}

async fn prune(config: AppConfig, older_than_hours: u64) -> anyhow::Result<()> {
    let store: Arc<dyn SignatureStore> = Arc::new(SqliteSignatureStore::open(&config.storage.db_path)?);
    let pruner = Pruner::new(Arc::clone(&store), config.storage.prune_interval_secs, older_than_hours)?;

    let pruned = pruner.prune_once().await?;
    println!("Pruned {} records, {} remaining", pruned, store.len().await?);

    Ok(())
}

fn show_info(config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn init_tracing(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
