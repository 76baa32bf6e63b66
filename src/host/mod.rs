//! Host (world-side) integration seams
//!
//! The money module never talks to the simulator directly; it goes through
//! three narrow traits. [`HostSession`] answers "is this user here, and who
//! are they", [`HostDelivery`] hands purchased goods over, and
//! [`UserNotifier`] pushes alerts and balance updates at users. A real
//! embedding implements these against the simulator; [`logging::LoggingHost`]
//! stands in when running standalone.

use async_trait::async_trait;

use crate::core_types::{Amount, IdentityId};
use crate::escrow::asset::{ItemRef, SaleKind};

pub mod logging;

pub use logging::LoggingHost;

/// A user as the host sees them right now.
#[derive(Debug, Clone, PartialEq)]
pub struct UserHandle {
    pub identity: IdentityId,
    pub display_name: String,
    /// Where completion notices can reach the user out-of-band (email or
    /// empty when the host exposes none).
    pub contact: String,
}

/// Result of a world-side delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliverOutcome {
    Delivered,
    Failed(String),
}

impl DeliverOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliverOutcome::Delivered)
    }
}

/// Live-presence lookup.
#[async_trait]
pub trait HostSession: Send + Sync {
    fn name(&self) -> &'static str;

    /// None when the identity has no live session on this host.
    async fn resolve(&self, identity: IdentityId) -> Option<UserHandle>;
}

/// Hands escrowed goods to the buyer when an asset enacts.
#[async_trait]
pub trait HostDelivery: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(
        &self,
        buyer: &UserHandle,
        item: &ItemRef,
        sale_kind: SaleKind,
        sale_price: Amount,
    ) -> DeliverOutcome;
}

/// Pushes user-facing messages.
#[async_trait]
pub trait UserNotifier: Send + Sync {
    async fn alert(&self, identity: IdentityId, message: &str);

    async fn balance_update(&self, identity: IdentityId, balance: Amount);
}


#[cfg(test)]
pub use mock::MockHost;
