//! Escrow asset registry
//!
//! Holds every live escrow asset and drives the three remote-initiated
//! steps against it. Steps arrive as HTTP callbacks and may repeat, race,
//! or arrive out of order; a per-asset async mutex serializes them, and the
//! state machine decides what each arrival means.
//!
//! Step results are [`StepReply`] values, not errors: the remote treats
//! `success=false` with the message `"pending"` as "try me again later"
//! and anything else as a permanent refusal.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core_types::{Amount, TimestampMs, TransactionId};
use crate::escrow::asset::EscrowAsset;
use crate::escrow::error::EscrowError;
use crate::escrow::state::AssetState;
use crate::host::{DeliverOutcome, HostDelivery, HostSession, UserNotifier};

/// Reply message that asks the remote to retry the step later.
pub const RETRY_MESSAGE: &str = "pending";

/// Answer to one enact/consume/cancel callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReply {
    pub success: bool,
    pub message: String,
}

impl StepReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn retry() -> Self {
        Self {
            success: false,
            message: RETRY_MESSAGE.to_string(),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }

    pub fn is_retry(&self) -> bool {
        !self.success && self.message == RETRY_MESSAGE
    }
}

pub struct AssetRegistry {
    assets: DashMap<TransactionId, Arc<Mutex<EscrowAsset>>>,
    session: Arc<dyn HostSession>,
    delivery: Arc<dyn HostDelivery>,
    notifier: Arc<dyn UserNotifier>,
}

impl AssetRegistry {
    pub fn new(
        session: Arc<dyn HostSession>,
        delivery: Arc<dyn HostDelivery>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Self {
        Self {
            assets: DashMap::new(),
            session,
            delivery,
            notifier,
        }
    }

    /// Register an asset before its transaction is submitted. One asset
    /// per transaction id, ever.
    pub fn create(&self, asset: EscrowAsset) -> Result<(), EscrowError> {
        match self.assets.entry(asset.txn_id) {
            Entry::Occupied(_) => Err(EscrowError::DuplicateTransaction(asset.txn_id)),
            Entry::Vacant(slot) => {
                debug!(txn_id = %asset.txn_id, ghost = asset.ghost, "escrow asset registered");
                slot.insert(Arc::new(Mutex::new(asset)));
                Ok(())
            }
        }
    }

    pub fn contains(&self, txn_id: TransactionId) -> bool {
        self.assets.contains_key(&txn_id)
    }

    fn shared(&self, txn_id: TransactionId) -> Result<Arc<Mutex<EscrowAsset>>, EscrowError> {
        self.assets
            .get(&txn_id)
            .map(|entry| entry.value().clone())
            .ok_or(EscrowError::UnknownTransaction(txn_id))
    }

    /// Enact: commit the world side. Ghost assets flip straight to
    /// ENACTED; delivery assets hand the item to the buyer first and stay
    /// ENACT_PENDING (retry) while that cannot happen.
    pub async fn enact(&self, txn_id: TransactionId) -> Result<StepReply, EscrowError> {
        let entry = self.shared(txn_id)?;
        let mut asset = entry.lock().await;

        match asset.state {
            // Replayed callback after success: agree, but never re-deliver.
            AssetState::Enacted => return Ok(StepReply::ok()),
            AssetState::Consumed | AssetState::Cancelled => {
                return Err(EscrowError::TerminalState {
                    txn_id,
                    state: asset.state,
                });
            }
            AssetState::Created | AssetState::EnactPending => {}
        }

        asset.touch(AssetState::EnactPending);

        if asset.ghost {
            asset.touch(AssetState::Enacted);
            info!(txn_id = %txn_id, "ghost asset enacted");
            return Ok(StepReply::ok());
        }

        let Some(item) = asset.item.clone() else {
            error!(txn_id = %txn_id, "non-ghost asset has no item");
            return Ok(StepReply::fail("asset has nothing to deliver"));
        };

        let Some(buyer) = self.session.resolve(asset.buyer).await else {
            debug!(txn_id = %txn_id, buyer = %asset.buyer, "buyer offline, enact stays pending");
            return Ok(StepReply::retry());
        };

        match self
            .delivery
            .deliver(&buyer, &item, asset.sale_kind, asset.sale_price)
            .await
        {
            DeliverOutcome::Delivered => {
                asset.touch(AssetState::Enacted);
                info!(txn_id = %txn_id, buyer = %asset.buyer, item = %item.name, "asset delivered, escrow enacted");
                Ok(StepReply::ok())
            }
            DeliverOutcome::Failed(why) => {
                warn!(txn_id = %txn_id, reason = %why, "delivery failed, enact stays pending");
                Ok(StepReply::retry())
            }
        }
    }

    /// Consume: the ledger committed the funds. Only legal from ENACTED;
    /// the buyer gets the ending balance the callback carried.
    pub async fn consume(
        &self,
        txn_id: TransactionId,
        buyer_ending_balance: Amount,
    ) -> Result<StepReply, EscrowError> {
        let entry = self.shared(txn_id)?;
        let mut asset = entry.lock().await;

        match asset.state {
            AssetState::Consumed | AssetState::Cancelled => {
                return Err(EscrowError::TerminalState {
                    txn_id,
                    state: asset.state,
                });
            }
            AssetState::Created | AssetState::EnactPending => {
                return Err(EscrowError::InvalidTransition {
                    txn_id,
                    from: asset.state,
                    to: AssetState::Consumed,
                });
            }
            AssetState::Enacted => {}
        }

        asset.buyer_ending_balance = Some(buyer_ending_balance);
        asset.touch(AssetState::Consumed);

        self.notifier
            .balance_update(asset.buyer, buyer_ending_balance)
            .await;
        // The callback carries only the buyer's balance; the seller gets a
        // completion notice, never a fabricated figure.
        if self.session.resolve(asset.seller).await.is_some() {
            let what = asset
                .item
                .as_ref()
                .map(|item| item.name.clone())
                .unwrap_or_else(|| "payment".to_string());
            self.notifier
                .alert(
                    asset.seller,
                    &format!("Sale of {} for {} completed.", what, asset.sale_price),
                )
                .await;
        }

        info!(txn_id = %txn_id, balance = buyer_ending_balance, "escrow consumed");
        Ok(StepReply::ok())
    }

    /// Cancel: the ledger is rolling the transaction back. Legal from any
    /// non-terminal state.
    pub async fn cancel(&self, txn_id: TransactionId) -> Result<StepReply, EscrowError> {
        let entry = self.shared(txn_id)?;
        let mut asset = entry.lock().await;

        if asset.state.is_terminal() {
            return Err(EscrowError::TerminalState {
                txn_id,
                state: asset.state,
            });
        }
        if asset.state == AssetState::Enacted {
            warn!(txn_id = %txn_id, "cancelling after delivery; goods already handed over");
        }

        asset.touch(AssetState::Cancelled);
        self.notifier
            .alert(
                asset.buyer,
                "Your purchase was rolled back; no funds moved.",
            )
            .await;
        info!(txn_id = %txn_id, "escrow cancelled");
        Ok(StepReply::ok())
    }

    /// Drop an asset from the registry. True when something was removed.
    pub fn remove(&self, txn_id: TransactionId) -> bool {
        self.assets.remove(&txn_id).is_some()
    }

    pub async fn snapshot(&self, txn_id: TransactionId) -> Option<EscrowAsset> {
        let entry = self.assets.get(&txn_id)?.value().clone();
        let asset = entry.lock().await;
        Some(asset.clone())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Ids of assets still waiting on enact past `cutoff_ms` (reaper input).
    pub async fn stale_pending(&self, cutoff_ms: TimestampMs) -> Vec<TransactionId> {
        // Clone the handles out first; entry refs must not live across await.
        let handles: Vec<Arc<Mutex<EscrowAsset>>> =
            self.assets.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for handle in handles {
            let asset = handle.lock().await;
            if matches!(
                asset.state,
                AssetState::Created | AssetState::EnactPending
            ) && asset.updated_at < cutoff_ms
            {
                out.push(asset.txn_id);
            }
        }
        out
    }

    /// Ids of settled assets older than `cutoff_ms` (reaper retention).
    pub async fn terminal_older_than(&self, cutoff_ms: TimestampMs) -> Vec<TransactionId> {
        let handles: Vec<Arc<Mutex<EscrowAsset>>> =
            self.assets.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for handle in handles {
            let asset = handle.lock().await;
            if asset.state.is_terminal() && asset.updated_at < cutoff_ms {
                out.push(asset.txn_id);
            }
        }
        out
    }

    /// Age an asset artificially (tests only).
    #[cfg(test)]
    pub(crate) async fn backdate(&self, txn_id: TransactionId, ms: i64) {
        if let Some(entry) = self.assets.get(&txn_id) {
            let handle = entry.value().clone();
            drop(entry);
            let mut asset = handle.lock().await;
            asset.updated_at -= ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::asset::{ItemRef, SaleKind};
    use crate::host::MockHost;
    use uuid::Uuid;

    fn registry_with_host() -> (AssetRegistry, Arc<MockHost>) {
        let host = Arc::new(MockHost::new());
        let registry = AssetRegistry::new(host.clone(), host.clone(), host.clone());
        (registry, host)
    }

    fn item() -> ItemRef {
        ItemRef {
            category: "object".to_string(),
            local_id: Uuid::new_v4(),
            name: "garden bench".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let (registry, _) = registry_with_host();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();

        registry
            .create(EscrowAsset::ghost(txn_id, buyer, seller, 50))
            .unwrap();
        let err = registry
            .create(EscrowAsset::ghost(txn_id, buyer, seller, 50))
            .unwrap_err();
        assert_eq!(err, EscrowError::DuplicateTransaction(txn_id));
    }

    #[tokio::test]
    async fn test_enact_unknown_transaction() {
        let (registry, _) = registry_with_host();
        let txn_id = TransactionId::new();
        let err = registry.enact(txn_id).await.unwrap_err();
        assert_eq!(err, EscrowError::UnknownTransaction(txn_id));
    }

    #[tokio::test]
    async fn test_ghost_enact_skips_delivery() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        registry
            .create(EscrowAsset::ghost(txn_id, Uuid::new_v4(), Uuid::new_v4(), 50))
            .unwrap();

        let reply = registry.enact(txn_id).await.unwrap();
        assert!(reply.success);
        assert_eq!(host.deliver_count.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(
            registry.snapshot(txn_id).await.unwrap().state,
            AssetState::Enacted
        );
    }

    #[tokio::test]
    async fn test_enact_delivers_once_even_when_replayed() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        registry
            .create(EscrowAsset::delivery(
                txn_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                item(),
                SaleKind::Copy,
                100,
            ))
            .unwrap();

        assert!(registry.enact(txn_id).await.unwrap().success);
        assert!(registry.enact(txn_id).await.unwrap().success);
        assert_eq!(host.deliver_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enact_offline_buyer_stays_pending() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        host.set_offline(buyer);
        registry
            .create(EscrowAsset::delivery(
                txn_id,
                buyer,
                Uuid::new_v4(),
                item(),
                SaleKind::Original,
                100,
            ))
            .unwrap();

        let reply = registry.enact(txn_id).await.unwrap();
        assert!(reply.is_retry());
        assert_eq!(
            registry.snapshot(txn_id).await.unwrap().state,
            AssetState::EnactPending
        );

        // Buyer comes back; the retried callback completes the step
        host.set_online(buyer);
        assert!(registry.enact(txn_id).await.unwrap().success);
        assert_eq!(
            registry.snapshot(txn_id).await.unwrap().state,
            AssetState::Enacted
        );
    }

    #[tokio::test]
    async fn test_enact_delivery_failure_is_retryable() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        host.set_fail_delivery(true);
        registry
            .create(EscrowAsset::delivery(
                txn_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                item(),
                SaleKind::Copy,
                100,
            ))
            .unwrap();

        assert!(registry.enact(txn_id).await.unwrap().is_retry());
        host.set_fail_delivery(false);
        assert!(registry.enact(txn_id).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_consume_before_enact_rejected() {
        let (registry, _) = registry_with_host();
        let txn_id = TransactionId::new();
        registry
            .create(EscrowAsset::ghost(txn_id, Uuid::new_v4(), Uuid::new_v4(), 50))
            .unwrap();

        let err = registry.consume(txn_id, 950).await.unwrap_err();
        assert_eq!(
            err,
            EscrowError::InvalidTransition {
                txn_id,
                from: AssetState::Created,
                to: AssetState::Consumed,
            }
        );
    }

    #[tokio::test]
    async fn test_consume_pushes_buyer_balance_and_seller_alert() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        registry
            .create(EscrowAsset::delivery(
                txn_id,
                buyer,
                seller,
                item(),
                SaleKind::Copy,
                100,
            ))
            .unwrap();

        registry.enact(txn_id).await.unwrap();
        let reply = registry.consume(txn_id, 900).await.unwrap();
        assert!(reply.success);

        assert_eq!(host.balances_for(buyer), vec![900]);
        let seller_alerts = host.alerts_for(seller);
        assert_eq!(seller_alerts.len(), 1);
        assert!(seller_alerts[0].contains("garden bench"));

        let asset = registry.snapshot(txn_id).await.unwrap();
        assert_eq!(asset.state, AssetState::Consumed);
        assert_eq!(asset.buyer_ending_balance, Some(900));
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        registry
            .create(EscrowAsset::ghost(txn_id, buyer, Uuid::new_v4(), 50))
            .unwrap();
        registry.enact(txn_id).await.unwrap();
        registry.consume(txn_id, 950).await.unwrap();

        let balances_before = host.balances_for(buyer).len();
        for result in [
            registry.enact(txn_id).await,
            registry.consume(txn_id, 1).await,
            registry.cancel(txn_id).await,
        ] {
            assert!(matches!(
                result.unwrap_err(),
                EscrowError::TerminalState { .. }
            ));
        }
        // No side effects from the rejected steps
        assert_eq!(host.balances_for(buyer).len(), balances_before);
    }

    #[tokio::test]
    async fn test_cancel_notifies_buyer() {
        let (registry, host) = registry_with_host();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        registry
            .create(EscrowAsset::ghost(txn_id, buyer, Uuid::new_v4(), 50))
            .unwrap();

        let reply = registry.cancel(txn_id).await.unwrap();
        assert!(reply.success);
        assert_eq!(
            registry.snapshot(txn_id).await.unwrap().state,
            AssetState::Cancelled
        );
        assert_eq!(host.alerts_for(buyer).len(), 1);
    }

    #[tokio::test]
    async fn test_stale_scans_pick_the_right_assets() {
        let (registry, _) = registry_with_host();
        let stale = TransactionId::new();
        let fresh = TransactionId::new();
        let done = TransactionId::new();
        for txn_id in [stale, fresh, done] {
            registry
                .create(EscrowAsset::ghost(txn_id, Uuid::new_v4(), Uuid::new_v4(), 10))
                .unwrap();
        }
        registry.enact(done).await.unwrap();
        registry.consume(done, 90).await.unwrap();

        registry.backdate(stale, 10_000).await;
        registry.backdate(done, 10_000).await;

        let now = chrono::Utc::now().timestamp_millis();
        let pending = registry.stale_pending(now - 5_000).await;
        assert_eq!(pending, vec![stale]);

        let terminal = registry.terminal_older_than(now - 5_000).await;
        assert_eq!(terminal, vec![done]);
    }
}
