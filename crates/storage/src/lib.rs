//! Durable per-transaction signature records.
//!
//! Every signature a node has seen for a transaction identity is folded into a
//! single envelope by [`SignatureStore::merge_and_persist`]. The merge is a
//! set union keyed by the exact XDR bytes of each signature, so replays and
//! overlapping deliveries never duplicate or drop an entry.
//!
//! Two backends share the trait: [`SqliteSignatureStore`] for nodes and
//! [`MemorySignatureStore`] for tests and throwaway nodes. Retention is a
//! separate concern handled by [`Pruner`].

pub mod memory;
pub mod merge;
pub mod pruner;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cosign_types::{Envelope, Result, TxIdentity};

pub use memory::MemorySignatureStore;
pub use merge::merge_signatures;
pub use pruner::{Pruner, MAX_RETENTION_HOURS};
pub use sqlite::SqliteSignatureStore;

#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Unions `incoming` with the stored record for `identity`, persists the
    /// result and returns it. Serialized per identity.
    async fn merge_and_persist(&self, identity: &TxIdentity, incoming: Envelope) -> Result<Envelope>;

    async fn get(&self, identity: &TxIdentity) -> Result<Option<Envelope>>;

    async fn len(&self) -> Result<usize>;

    /// Deletes records not updated since `cutoff`. Never called from the merge path.
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
