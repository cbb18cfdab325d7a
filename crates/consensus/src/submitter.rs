use cosign_ledger::LedgerClient;
use cosign_types::{Envelope, TxIdentity};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Fire-and-forget submission. Each ready envelope is sent once from its own
/// task; results are logged and never fed back into the store.
#[derive(Clone)]
pub struct Submitter {
    ledger: Arc<dyn LedgerClient>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl Submitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, max_in_flight: usize) -> Self {
        Self {
            ledger,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawns the submission and returns immediately. At most
    /// `max_in_flight` submissions talk to the ledger at once; the rest wait
    /// for a permit.
    pub fn submit(&self, identity: TxIdentity, envelope: Envelope) {
        let ledger = Arc::clone(&self.ledger);
        let permits = Arc::clone(&self.permits);

        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!("tx {}: submitter closed, dropping submission", identity);
                return;
            };

            info!(
                "tx {}: submitting with {} signatures",
                identity,
                envelope.signature_count()
            );

            match ledger.submit_transaction(&envelope).await {
                Ok(outcome) if outcome.successful => {
                    info!(
                        "tx {} submitted: successful: true hash: {}",
                        identity,
                        outcome.hash.as_deref().unwrap_or("-")
                    );
                }
                Ok(outcome) => {
                    let codes = outcome
                        .result_codes
                        .map(|codes| codes.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    warn!(
                        "tx {} submitted: successful: false result codes: {}",
                        identity, codes
                    );
                }
                Err(e) => {
                    error!("tx {} submission failed: {}", identity, e);
                }
            }
        });
    }

    /// Number of submissions spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every submission spawned so far.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
