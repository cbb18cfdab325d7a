use crate::authorization::AuthorizationGate;
use crate::fsm::{CollectCycle, CycleState};
use crate::submitter::Submitter;
use cosign_crypto::transaction_identity;
use cosign_network::Subscription;
use cosign_storage::SignatureStore;
use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a single delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Payload was not a supported envelope.
    Dropped,
    NotYetAuthorized { identity: TxIdentity, signatures: usize },
    Submitted { identity: TxIdentity, signatures: usize },
}

/// Receive loop: decode, merge, authorize, hand off to the submitter.
pub struct Collector {
    network_passphrase: String,
    store: Arc<dyn SignatureStore>,
    gate: Arc<dyn AuthorizationGate>,
    submitter: Submitter,
}

impl Collector {
    pub fn new(
        network_passphrase: impl Into<String>,
        store: Arc<dyn SignatureStore>,
        gate: Arc<dyn AuthorizationGate>,
        submitter: Submitter,
    ) -> Self {
        Self {
            network_passphrase: network_passphrase.into(),
            store,
            gate,
            submitter,
        }
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    /// Processes deliveries until the subscription closes. Only a closed
    /// subscription ends the loop; everything else is logged and skipped.
    pub async fn run(&self, mut subscription: Subscription) -> Result<()> {
        info!("Collector started");

        loop {
            let message = match subscription.next().await {
                Ok(message) => message,
                Err(e) => {
                    error!("Collector stopping: {}", e);
                    return Err(e);
                }
            };

            match self.process_message(&message.data).await {
                Ok(outcome) => debug!("Delivery from {:?}: {:?}", message.source, outcome),
                Err(e) if e.is_per_message() => {
                    warn!("Skipping delivery from {:?}: {}", message.source, e)
                }
                Err(e) => error!("Failed to process delivery from {:?}: {}", message.source, e),
            }
        }
    }

    /// Handles one raw gossip payload.
    pub async fn process_message(&self, data: &[u8]) -> Result<CycleOutcome> {
        match Envelope::from_xdr(data) {
            Ok(envelope) => self.process_envelope(envelope).await,
            Err(e) => {
                warn!("Dropping gossip message ({} bytes): {}", data.len(), e);
                Ok(CycleOutcome::Dropped)
            }
        }
    }

    pub async fn process_envelope(&self, envelope: Envelope) -> Result<CycleOutcome> {
        let identity = transaction_identity(&envelope, &self.network_passphrase)?;
        let mut cycle = CollectCycle::new(identity);

        info!(
            "tx {} received: sig count: {}",
            identity,
            envelope.signature_count()
        );

        let merged = self.store.merge_and_persist(&identity, envelope).await?;
        cycle.merged(merged.signature_count())?;

        info!("tx {} merged: sig count: {}", identity, cycle.signatures());

        match self.gate.check_authorized(&identity, merged).await {
            Ok(ready) => {
                cycle.authorized()?;
                self.submitter.submit(identity, ready);
                cycle.submitted()?;
            }
            Err(e) if e.is_not_authorized() => {
                cycle.not_yet_authorized()?;
                info!("tx {} not yet authorized", identity);
            }
            Err(e) => return Err(e),
        }

        outcome_of(&cycle)
    }
}

fn outcome_of(cycle: &CollectCycle) -> Result<CycleOutcome> {
    let identity = *cycle.identity();
    let signatures = cycle.signatures();

    match cycle.current_state() {
        CycleState::Submitted => Ok(CycleOutcome::Submitted {
            identity,
            signatures,
        }),
        CycleState::NotYetAuthorized => Ok(CycleOutcome::NotYetAuthorized {
            identity,
            signatures,
        }),
        state => Err(CosignError::InvalidTransition(format!(
            "tx {}: cycle stopped in non-terminal state {:?}",
            identity, state
        ))),
    }
}
