use crate::SignatureStore;
use chrono::{Duration, Utc};
use cosign_types::{CosignError, Result};
use std::sync::Arc;
use tokio::time;
use tracing::{error, info};

/// Periodically deletes signature records that have stopped changing.
///
/// A transaction that is still gathering signatures keeps bumping its
/// `updated_at`, so only records idle for longer than the retention window go.
/// Longest retention accepted, roughly a century.
pub const MAX_RETENTION_HOURS: u64 = 24 * 365 * 100;

pub struct Pruner {
    store: Arc<dyn SignatureStore>,
    interval: time::Duration,
    retention: Duration,
}

impl Pruner {
    pub fn new(
        store: Arc<dyn SignatureStore>,
        interval_secs: u64,
        retention_hours: u64,
    ) -> Result<Self> {
        if retention_hours > MAX_RETENTION_HOURS {
            return Err(CosignError::ConfigError(format!(
                "retention of {} hours exceeds the maximum of {}",
                retention_hours, MAX_RETENTION_HOURS
            )));
        }

        let retention = i64::try_from(retention_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                CosignError::ConfigError(format!("invalid retention: {} hours", retention_hours))
            })?;

        Ok(Self {
            store,
            interval: time::Duration::from_secs(interval_secs.max(1)),
            retention,
        })
    }

    /// Start the pruning loop
    pub async fn run(self) -> Result<()> {
        info!("Pruner started");
        info!("  Interval: {}s", self.interval.as_secs());
        info!("  Retention: {} hours", self.retention.num_hours());

        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.prune_once().await {
                error!("Pruning failed: {}", e);
            }
        }
    }

    pub async fn prune_once(&self) -> Result<usize> {
        let cutoff = Utc::now().checked_sub_signed(self.retention).ok_or_else(|| {
            CosignError::ConfigError(format!(
                "retention of {} hours reaches before the earliest timestamp",
                self.retention.num_hours()
            ))
        })?;
        let pruned = self.store.prune_older_than(cutoff).await?;
        info!("Pruned {} txs idle since before {}", pruned, cutoff);
        Ok(pruned)
    }
}
