//! Persistent link/transaction store
//!
//! Two small trait seams keep the module independent of where state lives:
//! [`LinkStore`] persists account links, [`TxnStore`] persists submitted
//! transaction records. [`connect`] builds both from config; the memory
//! backend serves dev/test, Postgres serves real deployments.
//!
//! One struct per backend implements both traits, so a single connection
//! pool (or map) backs both concerns.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::core_types::{IdentityId, TransactionId};
use crate::link::models::AccountLink;
use crate::txn::types::{TxnRecord, TxnStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing table holds several rows for a key that must be unique.
    /// Surfaced instead of silently picking one, so the corruption gets
    /// fixed rather than papered over.
    #[error("integrity violation: {count} rows for key {key}")]
    DuplicateRows { key: String, count: usize },

    #[error("store config error: {0}")]
    Config(String),
}

/// Persistence for account links, keyed by (app_key, identity).
#[async_trait]
pub trait LinkStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Exactly zero or one row may exist per key; several rows is a
    /// [`StoreError::DuplicateRows`] integrity failure.
    async fn get_link(
        &self,
        app_key: &str,
        identity: IdentityId,
    ) -> Result<Option<AccountLink>, StoreError>;

    async fn upsert_link(&self, link: &AccountLink) -> Result<(), StoreError>;
}

/// Persistence for submitted-transaction records, keyed by transaction id.
#[async_trait]
pub trait TxnStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_txn(&self, txn_id: TransactionId) -> Result<Option<TxnRecord>, StoreError>;

    async fn upsert_txn(&self, record: &TxnRecord) -> Result<(), StoreError>;

    /// Returns false when no record with that id exists.
    async fn set_txn_status(
        &self,
        txn_id: TransactionId,
        status: TxnStatus,
    ) -> Result<bool, StoreError>;
}

/// Build both store handles from config.
pub async fn connect(
    cfg: &StoreConfig,
) -> Result<(Arc<dyn LinkStore>, Arc<dyn TxnStore>), StoreError> {
    match cfg.backend.as_str() {
        "memory" => {
            let store = Arc::new(MemStore::new());
            let links: Arc<dyn LinkStore> = store.clone();
            let txns: Arc<dyn TxnStore> = store;
            Ok((links, txns))
        }
        "postgres" => {
            let url = cfg.postgres_url.as_deref().ok_or_else(|| {
                StoreError::Config("postgres backend requires store.postgres_url".to_string())
            })?;
            let store = Arc::new(PgStore::connect(url).await?);
            let links: Arc<dyn LinkStore> = store.clone();
            let txns: Arc<dyn TxnStore> = store;
            Ok((links, txns))
        }
        other => Err(StoreError::Config(format!(
            "unknown store backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let cfg = StoreConfig {
            backend: "memory".to_string(),
            postgres_url: None,
        };
        let (links, txns) = connect(&cfg).await.unwrap();
        assert_eq!(links.name(), "memory");
        assert_eq!(txns.name(), "memory");
    }

    #[tokio::test]
    async fn test_connect_unknown_backend() {
        let cfg = StoreConfig {
            backend: "sqlite".to_string(),
            postgres_url: None,
        };
        let err = connect(&cfg).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_postgres_without_url() {
        let cfg = StoreConfig {
            backend: "postgres".to_string(),
            postgres_url: None,
        };
        let err = connect(&cfg).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
