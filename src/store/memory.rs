//! In-memory store backend (dev/test)

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core_types::{IdentityId, TransactionId};
use crate::link::models::AccountLink;
use crate::store::{LinkStore, StoreError, TxnStore};
use crate::txn::types::{TxnRecord, TxnStatus};

/// DashMap-backed store. Honors the same contracts as the Postgres
/// backend, minus durability.
pub struct MemStore {
    links: DashMap<(String, IdentityId), AccountLink>,
    txns: DashMap<TransactionId, TxnRecord>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            txns: DashMap::new(),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for MemStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_link(
        &self,
        app_key: &str,
        identity: IdentityId,
    ) -> Result<Option<AccountLink>, StoreError> {
        let key = (app_key.to_string(), identity);
        Ok(self.links.get(&key).map(|entry| entry.value().clone()))
    }

    async fn upsert_link(&self, link: &AccountLink) -> Result<(), StoreError> {
        let key = (link.app_key.clone(), link.identity);
        self.links.insert(key, link.clone());
        Ok(())
    }
}

#[async_trait]
impl TxnStore for MemStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_txn(&self, txn_id: TransactionId) -> Result<Option<TxnRecord>, StoreError> {
        Ok(self.txns.get(&txn_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_txn(&self, record: &TxnRecord) -> Result<(), StoreError> {
        self.txns.insert(record.txn_id, record.clone());
        Ok(())
    }

    async fn set_txn_status(
        &self,
        txn_id: TransactionId,
        status: TxnStatus,
    ) -> Result<bool, StoreError> {
        match self.txns.get_mut(&txn_id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                record.status = status;
                record.updated_at = chrono::Utc::now().timestamp_millis();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::types::TransferSpec;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_link_get_miss_is_none() {
        let store = MemStore::new();
        let found = store.get_link("app-1", Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_link_upsert_then_get() {
        let store = MemStore::new();
        let mut link = AccountLink::unauthorized("app-1", Uuid::new_v4());
        link.token = "tok-1".to_string();
        link.remote_account = "acct-9".to_string();
        store.upsert_link(&link).await.unwrap();

        let found = store
            .get_link("app-1", link.identity)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, link);
    }

    #[tokio::test]
    async fn test_link_keyed_by_app_and_identity() {
        let store = MemStore::new();
        let identity = Uuid::new_v4();
        let link = AccountLink::unauthorized("app-1", identity);
        store.upsert_link(&link).await.unwrap();

        assert!(store.get_link("app-2", identity).await.unwrap().is_none());
        assert!(store.get_link("app-1", identity).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_txn_status_update() {
        let store = MemStore::new();
        let spec = TransferSpec::gift(Uuid::new_v4(), Uuid::new_v4(), 50);
        let record = TxnRecord::new(TransactionId::new(), &spec);
        store.upsert_txn(&record).await.unwrap();

        let updated = store
            .set_txn_status(record.txn_id, TxnStatus::Succeeded)
            .await
            .unwrap();
        assert!(updated);

        let found = store.get_txn(record.txn_id).await.unwrap().unwrap();
        assert_eq!(found.status, TxnStatus::Succeeded);
        assert!(found.updated_at >= record.updated_at);
    }

    #[tokio::test]
    async fn test_txn_status_update_missing_id() {
        let store = MemStore::new();
        let updated = store
            .set_txn_status(TransactionId::new(), TxnStatus::Failed)
            .await
            .unwrap();
        assert!(!updated);
    }
}
