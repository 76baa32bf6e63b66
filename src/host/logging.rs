//! Log-only host used when no simulator is attached

use async_trait::async_trait;
use tracing::info;

use crate::core_types::{Amount, IdentityId};
use crate::escrow::asset::{ItemRef, SaleKind};
use crate::host::{DeliverOutcome, HostDelivery, HostSession, UserHandle, UserNotifier};

/// Stand-in host for standalone runs: every user resolves, every delivery
/// succeeds, every notification is a log line. Lets the callback surface
/// and escrow flows run end to end without a world behind them.
pub struct LoggingHost;

#[async_trait]
impl HostSession for LoggingHost {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn resolve(&self, identity: IdentityId) -> Option<UserHandle> {
        Some(UserHandle {
            identity,
            display_name: format!("standalone-{}", identity),
            contact: String::new(),
        })
    }
}

#[async_trait]
impl HostDelivery for LoggingHost {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn deliver(
        &self,
        buyer: &UserHandle,
        item: &ItemRef,
        sale_kind: SaleKind,
        sale_price: Amount,
    ) -> DeliverOutcome {
        info!(
            buyer = %buyer.identity,
            item = %item.name,
            kind = %sale_kind,
            price = sale_price,
            "deliver (standalone, no-op)"
        );
        DeliverOutcome::Delivered
    }
}

#[async_trait]
impl UserNotifier for LoggingHost {
    async fn alert(&self, identity: IdentityId, message: &str) {
        info!(identity = %identity, message, "user alert");
    }

    async fn balance_update(&self, identity: IdentityId, balance: Amount) {
        info!(identity = %identity, balance, "balance update");
    }
}
