//! Transaction submission types and stored records

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core_types::{Amount, IdentityId, TimestampMs, TransactionId};
use crate::escrow::asset::{ItemRef, SaleKind};

/// Lifecycle of a submitted transaction as seen from this side.
///
/// The remote ledger owns the real state; this status only tracks what the
/// completion callback has told us, so restarts can tell settled
/// transactions from in-flight ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TxnStatus {
    /// Dispatched (or about to be); no completion callback yet
    Submitted = 0,
    /// Ledger accepted and queued the transfer, outcome still open
    Queued = 10,
    /// Completion callback reported success (terminal)
    Succeeded = 20,
    /// Completion callback reported a definitive failure (terminal)
    Failed = -10,
}

impl TxnStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxnStatus::Succeeded | TxnStatus::Failed)
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TxnStatus::Submitted),
            10 => Some(TxnStatus::Queued),
            20 => Some(TxnStatus::Succeeded),
            -10 => Some(TxnStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Submitted => "SUBMITTED",
            TxnStatus::Queued => "QUEUED",
            TxnStatus::Succeeded => "SUCCEEDED",
            TxnStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TxnStatus {
    type Error = ();

    fn try_from(id: i16) -> Result<Self, Self::Error> {
        TxnStatus::from_id(id).ok_or(())
    }
}

/// What the escrow side of a submission should carry.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSpec {
    /// `None` makes a ghost asset: the transfer still runs through the
    /// enact/consume handshake but nothing is delivered.
    pub item: Option<ItemRef>,
    pub sale_kind: SaleKind,
}

/// Context annotations recorded ledger-side with a transaction, grouped
/// the way the ledger's history view presents them. All free-form; none
/// of it affects how the transfer is processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferDetails {
    /// About the submitting world (grid name, module version).
    pub platform: Vec<(String, String)>,
    /// Where the transfer happened (region, position).
    pub location: Vec<(String, String)>,
    /// Specific to this transfer (object ids, sale terms).
    pub transaction: Vec<(String, String)>,
}

impl TransferDetails {
    pub fn is_empty(&self) -> bool {
        self.platform.is_empty() && self.location.is_empty() && self.transaction.is_empty()
    }
}

/// A transfer as requested by the world side, before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSpec {
    pub sender: IdentityId,
    pub recipient: IdentityId,
    pub amount: Amount,
    pub description: String,
    pub details: TransferDetails,
    pub asset: Option<AssetSpec>,
}

impl TransferSpec {
    /// Plain user-to-user gift; no escrow side.
    pub fn gift(sender: IdentityId, recipient: IdentityId, amount: Amount) -> Self {
        Self {
            sender,
            recipient,
            amount,
            description: String::new(),
            details: TransferDetails::default(),
            asset: None,
        }
    }

    /// Object purchase: escrowed delivery of `item` on enact.
    pub fn purchase(
        sender: IdentityId,
        recipient: IdentityId,
        amount: Amount,
        item: ItemRef,
        sale_kind: SaleKind,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            description: format!("purchase of {}", item.name),
            details: TransferDetails::default(),
            asset: Some(AssetSpec {
                item: Some(item),
                sale_kind,
            }),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_platform_detail(mut self, key: &str, value: &str) -> Self {
        self.details
            .platform
            .push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_location_detail(mut self, key: &str, value: &str) -> Self {
        self.details
            .location
            .push((key.to_string(), value.to_string()));
        self
    }

    /// Transaction-specific annotation.
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details
            .transaction
            .push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a ghost asset so the transfer gates through enact/consume.
    pub fn with_ghost_asset(mut self) -> Self {
        self.asset = Some(AssetSpec {
            item: None,
            sale_kind: SaleKind::NotForSale,
        });
        self
    }
}

/// Stored record of one submission, keyed by transaction id.
///
/// Written before dispatch so a completion callback that arrives after a
/// process restart (or with the party ids omitted) can still be correlated.
#[derive(Debug, Clone, PartialEq)]
pub struct TxnRecord {
    pub txn_id: TransactionId,
    pub sender: IdentityId,
    pub recipient: IdentityId,
    pub amount: Amount,
    pub description: String,
    pub asset_attached: bool,
    pub status: TxnStatus,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
}

impl TxnRecord {
    pub fn new(txn_id: TransactionId, spec: &TransferSpec) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            txn_id,
            sender: spec.sender,
            recipient: spec.recipient,
            amount: spec.amount,
            description: spec.description.clone(),
            asset_attached: spec.asset.is_some(),
            status: TxnStatus::Submitted,
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Display for TxnRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Txn[{} {} {} -> {} amount={} asset={}]",
            self.txn_id,
            self.status,
            self.sender,
            self.recipient,
            self.amount,
            self.asset_attached
        )
    }
}

/// Callback endpoints advertised to the ledger with every submission.
///
/// Built once from the configured external base URL; the transaction id
/// travels in callback bodies, not in these URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackUrls {
    pub completion: String,
    pub enact: String,
    pub consume: String,
    pub cancel: String,
}

impl CallbackUrls {
    pub fn from_base(external_base: &str) -> Self {
        let base = external_base.trim_end_matches('/');
        Self {
            completion: format!("{}/callback/transaction", base),
            enact: format!("{}/callback/asset/enact", base),
            consume: format!("{}/callback/asset/consume", base),
            cancel: format!("{}/callback/asset/cancel", base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TxnStatus::Submitted,
            TxnStatus::Queued,
            TxnStatus::Succeeded,
            TxnStatus::Failed,
        ] {
            assert_eq!(TxnStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(TxnStatus::from_id(77), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(TxnStatus::Succeeded.is_terminal());
        assert!(TxnStatus::Failed.is_terminal());
        assert!(!TxnStatus::Submitted.is_terminal());
        assert!(!TxnStatus::Queued.is_terminal());
    }

    #[test]
    fn test_gift_spec_has_no_asset() {
        let spec = TransferSpec::gift(Uuid::new_v4(), Uuid::new_v4(), 50);
        assert!(spec.asset.is_none());
        let record = TxnRecord::new(TransactionId::new(), &spec);
        assert!(!record.asset_attached);
        assert_eq!(record.status, TxnStatus::Submitted);
    }

    #[test]
    fn test_ghost_asset_spec() {
        let spec = TransferSpec::gift(Uuid::new_v4(), Uuid::new_v4(), 50).with_ghost_asset();
        let asset = spec.asset.as_ref().unwrap();
        assert!(asset.item.is_none());
        assert!(TxnRecord::new(TransactionId::new(), &spec).asset_attached);
    }

    #[test]
    fn test_details_land_in_their_groups() {
        let spec = TransferSpec::gift(Uuid::new_v4(), Uuid::new_v4(), 50)
            .with_platform_detail("grid", "test-grid")
            .with_location_detail("region", "Sandbox")
            .with_detail("object-id", "42");
        assert_eq!(spec.details.platform, vec![("grid".into(), "test-grid".into())]);
        assert_eq!(spec.details.location, vec![("region".into(), "Sandbox".into())]);
        assert_eq!(
            spec.details.transaction,
            vec![("object-id".into(), "42".into())]
        );
        assert!(!spec.details.is_empty());
        assert!(TransferDetails::default().is_empty());
    }

    #[test]
    fn test_callback_urls_from_base() {
        let urls = CallbackUrls::from_base("https://money.grid.example/");
        assert_eq!(
            urls.completion,
            "https://money.grid.example/callback/transaction"
        );
        assert_eq!(urls.enact, "https://money.grid.example/callback/asset/enact");
        assert_eq!(
            urls.cancel,
            "https://money.grid.example/callback/asset/cancel"
        );
    }
}
