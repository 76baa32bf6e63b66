//! Escrow asset records

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_types::{Amount, IdentityId, TimestampMs, TransactionId};
use crate::escrow::state::AssetState;

/// How a purchased item changes hands when the escrow enacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum SaleKind {
    NotForSale = 0,
    /// The original object moves to the buyer
    Original = 1,
    /// The buyer receives a copy
    Copy = 2,
    /// Only the object's contents transfer
    Contents = 3,
}

impl SaleKind {
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(SaleKind::NotForSale),
            1 => Some(SaleKind::Original),
            2 => Some(SaleKind::Copy),
            3 => Some(SaleKind::Contents),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleKind::NotForSale => "NOT_FOR_SALE",
            SaleKind::Original => "ORIGINAL",
            SaleKind::Copy => "COPY",
            SaleKind::Contents => "CONTENTS",
        }
    }
}

impl fmt::Display for SaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// World-side handle to the thing being sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    /// Host object category ("object", "land-pass", ...)
    pub category: String,
    /// Host-local object id
    pub local_id: Uuid,
    pub name: String,
}

/// One two-phase escrow: world-side goods held against a remote transfer.
///
/// Enact delivers the goods (or, for a ghost asset, does nothing but gate
/// the transfer), consume finalizes after the ledger commits, cancel rolls
/// back. The remote ledger drives all three through callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct EscrowAsset {
    pub txn_id: TransactionId,
    pub buyer: IdentityId,
    pub seller: IdentityId,
    /// Ghost assets carry no item; they exist purely so the transfer runs
    /// through the enact/consume handshake.
    pub ghost: bool,
    pub item: Option<ItemRef>,
    pub sale_kind: SaleKind,
    pub sale_price: Amount,
    pub state: AssetState,
    /// Buyer's ending balance reported by the consume callback.
    pub buyer_ending_balance: Option<Amount>,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
}

impl EscrowAsset {
    /// Asset that gates a transfer without delivering anything.
    pub fn ghost(
        txn_id: TransactionId,
        buyer: IdentityId,
        seller: IdentityId,
        sale_price: Amount,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            txn_id,
            buyer,
            seller,
            ghost: true,
            item: None,
            sale_kind: SaleKind::NotForSale,
            sale_price,
            state: AssetState::Created,
            buyer_ending_balance: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Asset whose enact step hands `item` to the buyer.
    pub fn delivery(
        txn_id: TransactionId,
        buyer: IdentityId,
        seller: IdentityId,
        item: ItemRef,
        sale_kind: SaleKind,
        sale_price: Amount,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            txn_id,
            buyer,
            seller,
            ghost: false,
            item: Some(item),
            sale_kind,
            sale_price,
            state: AssetState::Created,
            buyer_ending_balance: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, state: AssetState) {
        self.state = state;
        self.updated_at = Utc::now().timestamp_millis();
    }
}

impl fmt::Display for EscrowAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EscrowAsset[{} {} buyer={} seller={} price={} ghost={}]",
            self.txn_id, self.state, self.buyer, self.seller, self.sale_price, self.ghost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ItemRef {
        ItemRef {
            category: "object".to_string(),
            local_id: Uuid::new_v4(),
            name: "toy rocket".to_string(),
        }
    }

    #[test]
    fn test_ghost_asset_has_no_item() {
        let a = EscrowAsset::ghost(TransactionId::new(), Uuid::new_v4(), Uuid::new_v4(), 50);
        assert!(a.ghost);
        assert!(a.item.is_none());
        assert_eq!(a.state, AssetState::Created);
        assert_eq!(a.sale_kind, SaleKind::NotForSale);
    }

    #[test]
    fn test_delivery_asset() {
        let a = EscrowAsset::delivery(
            TransactionId::new(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            item(),
            SaleKind::Copy,
            100,
        );
        assert!(!a.ghost);
        assert_eq!(a.item.as_ref().unwrap().name, "toy rocket");
        assert_eq!(a.sale_price, 100);
    }

    #[test]
    fn test_touch_moves_state_and_timestamp() {
        let mut a = EscrowAsset::ghost(TransactionId::new(), Uuid::new_v4(), Uuid::new_v4(), 1);
        let before = a.updated_at;
        a.touch(AssetState::Enacted);
        assert_eq!(a.state, AssetState::Enacted);
        assert!(a.updated_at >= before);
    }

    #[test]
    fn test_sale_kind_roundtrip() {
        for kind in [
            SaleKind::NotForSale,
            SaleKind::Original,
            SaleKind::Copy,
            SaleKind::Contents,
        ] {
            assert_eq!(SaleKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(SaleKind::from_id(9), None);
    }
}
