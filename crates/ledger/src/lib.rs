//! Ledger boundary: the threshold oracle and the submission sink.
//!
//! The node only ever talks to the ledger through [`LedgerClient`], so the
//! collector can be exercised against an in-process fake.

pub mod horizon;
pub mod models;

use async_trait::async_trait;
use cosign_types::{Envelope, Result};

pub use horizon::HorizonClient;
pub use models::{account_id, AccountSigner, AccountThresholds, SignerKey, SubmitOutcome, ThresholdLevel};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Passphrase of the network the ledger serves.
    async fn network_passphrase(&self) -> Result<String>;

    /// Current thresholds and signers of an account (strkey `G...` id).
    async fn account_thresholds(&self, account_id: &str) -> Result<AccountThresholds>;

    /// Sends a signed envelope once. A rejected transaction is an `Ok`
    /// outcome with `successful == false`; only transport failures are errors.
    async fn submit_transaction(&self, envelope: &Envelope) -> Result<SubmitOutcome>;
}
