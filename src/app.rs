use crate::config::AppConfig;
use anyhow::Context;
use cosign_api::AppState;
use cosign_consensus::{Collector, LedgerAuthorizer, Submitter};
use cosign_ledger::{HorizonClient, LedgerClient};
use cosign_network::{Keypair, P2PNode};
use cosign_storage::{Pruner, SignatureStore, SqliteSignatureStore};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A running co-signing node: p2p swarm, collector, optional pruner and the
/// HTTP ingress, wired from one configuration.
pub struct CosignNode {
    config: AppConfig,
}

impl CosignNode {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.config;

        let ledger = Arc::new(HorizonClient::new(
            config.ledger.horizon_url.clone(),
            config.ledger.request_timeout_secs,
        )?);
        let passphrase = ledger
            .network_passphrase()
            .await
            .with_context(|| format!("Fetching network passphrase from {}", ledger.base_url()))?;
        info!("Ledger: {} ({})", ledger.base_url(), passphrase);

        let store: Arc<dyn SignatureStore> = Arc::new(SqliteSignatureStore::open(&config.storage.db_path)?);

        let (mut p2p_node, gossip, subscription) = P2PNode::new(
            Keypair::generate_ed25519(),
            &config.network.topic,
            config.network.enable_mdns,
        )?;
        p2p_node.listen_on(config.p2p_listen_addr()?)?;

        for addr in config.bootstrap_peers()? {
            if let Err(e) = p2p_node.dial(addr.clone()) {
                warn!("Could not dial bootstrap peer {}: {}", addr, e);
            }
        }

        let submitter = Submitter::new(ledger.clone(), config.submission.max_in_flight);
        let gate = Arc::new(LedgerAuthorizer::new(ledger.clone()));
        let collector = Collector::new(passphrase.clone(), Arc::clone(&store), gate, submitter.clone());

        let mut p2p_task = tokio::spawn(p2p_node.run());
        let mut collector_task = tokio::spawn(async move { collector.run(subscription).await });

        if let Some(hours) = config.storage.prune_after_hours {
            let pruner = Pruner::new(Arc::clone(&store), config.storage.prune_interval_secs, hours)?;
            tokio::spawn(async move {
                if let Err(e) = pruner.run().await {
                    error!("Pruner stopped: {}", e);
                }
            });
        }

        let state = AppState::new(&passphrase, Arc::new(gossip));
        let http_addr = config.http_listen_addr()?;

        info!("===================================");
        info!("Co-signing node running");
        info!("===================================");

        let outcome = tokio::select! {
            result = &mut p2p_task => match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("P2P node stopped")),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("P2P node failed")),
                Err(e) => Err(anyhow::Error::new(e).context("P2P task panicked")),
            },
            result = &mut collector_task => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("Collector stopped")),
                Err(e) => Err(anyhow::Error::new(e).context("Collector task panicked")),
            },
            result = cosign_api::start_server(state, http_addr) => {
                result.context("HTTP ingress failed")
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                Ok(())
            }
        };

        p2p_task.abort();
        collector_task.abort();

        info!("Waiting for {} in-flight submissions", submitter.in_flight());
        submitter.wait_idle().await;

        outcome
    }
}
