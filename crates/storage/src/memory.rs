use crate::{merge_signatures, SignatureStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use std::collections::HashMap;
use tokio::sync::Mutex;

struct Record {
    envelope: Vec<u8>,
    updated_at: DateTime<Utc>,
}

/// Non-durable store. Records are kept XDR-encoded so decode failures surface
/// the same way they do on disk.
#[derive(Default)]
pub struct MemorySignatureStore {
    records: Mutex<HashMap<TxIdentity, Record>>,
}

impl MemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignatureStore for MemorySignatureStore {
    async fn merge_and_persist(&self, identity: &TxIdentity, incoming: Envelope) -> Result<Envelope> {
        let mut records = self.records.lock().await;

        let merged = match records.get(identity) {
            None => incoming,
            Some(record) => {
                let stored = Envelope::from_xdr(&record.envelope).map_err(|e| {
                    CosignError::CorruptRecord {
                        identity: *identity,
                        reason: e.to_string(),
                    }
                })?;
                merge_signatures(incoming, &stored)?
            }
        };

        records.insert(
            *identity,
            Record {
                envelope: merged.to_xdr()?,
                updated_at: Utc::now(),
            },
        );

        Ok(merged)
    }

    async fn get(&self, identity: &TxIdentity) -> Result<Option<Envelope>> {
        let records = self.records.lock().await;
        match records.get(identity) {
            None => Ok(None),
            Some(record) => Envelope::from_xdr(&record.envelope)
                .map(Some)
                .map_err(|e| CosignError::CorruptRecord {
                    identity: *identity,
                    reason: e.to_string(),
                }),
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.lock().await.len())
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.updated_at >= cutoff);
        Ok(before - records.len())
    }
}
