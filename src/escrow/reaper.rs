//! Background reaper for stuck and settled escrow assets
//!
//! The remote ledger owns retry timing, so by default nothing here runs
//! and assets wait as long as it takes. Deployments that want a bound
//! enable the reaper: assets stuck before ENACTED past `max_pending` get
//! cancelled (through the normal cancel path, so the buyer hears about
//! it), and terminal assets past `retention` get purged from the registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ReaperPolicyConfig;
use crate::escrow::registry::AssetRegistry;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub scan_interval: Duration,
    pub max_pending: Duration,
    pub retention: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            max_pending: Duration::from_secs(3600),
            retention: Duration::from_secs(86400),
        }
    }
}

impl From<&ReaperPolicyConfig> for ReaperConfig {
    fn from(policy: &ReaperPolicyConfig) -> Self {
        Self {
            scan_interval: Duration::from_secs(policy.scan_interval_secs),
            max_pending: Duration::from_secs(policy.max_pending_secs),
            retention: Duration::from_secs(policy.retention_secs),
        }
    }
}

pub struct PendingReaper {
    registry: Arc<AssetRegistry>,
    config: ReaperConfig,
}

impl PendingReaper {
    pub fn new(registry: Arc<AssetRegistry>, config: ReaperConfig) -> Self {
        Self { registry, config }
    }

    pub async fn run(&self) -> ! {
        info!(
            interval_secs = self.config.scan_interval.as_secs(),
            max_pending_secs = self.config.max_pending.as_secs(),
            "escrow reaper started"
        );
        loop {
            tokio::time::sleep(self.config.scan_interval).await;
            let (cancelled, purged) = self.scan().await;
            if cancelled > 0 || purged > 0 {
                info!(cancelled, purged, "escrow reaper pass");
            }
        }
    }

    /// One pass. Returns (cancelled, purged).
    pub async fn scan(&self) -> (usize, usize) {
        let now = Utc::now().timestamp_millis();

        let pending_cutoff = now - self.config.max_pending.as_millis() as i64;
        let mut cancelled = 0usize;
        for txn_id in self.registry.stale_pending(pending_cutoff).await {
            match self.registry.cancel(txn_id).await {
                Ok(_) => {
                    warn!(txn_id = %txn_id, "cancelled escrow stuck past max_pending");
                    cancelled += 1;
                }
                // The asset moved on between scan and cancel; leave it be.
                Err(e) => debug!(txn_id = %txn_id, error = %e, "stale asset settled before cancel"),
            }
        }

        let retention_cutoff = now - self.config.retention.as_millis() as i64;
        let mut purged = 0usize;
        for txn_id in self.registry.terminal_older_than(retention_cutoff).await {
            if self.registry.remove(txn_id) {
                purged += 1;
            }
        }

        (cancelled, purged)
    }
}
