//! Concurrency-safe account link cache
//!
//! Two-level locking: a [`DashMap`] shard lock guards the key space for
//! lookup/insert/evict, and an `Arc<tokio::sync::Mutex<AccountLink>>` per
//! entry serializes mutations (including their persistence write). The map
//! lock is never held across an await; entry population is
//! first-writer-wins so concurrent loaders converge on one shared entry.
//!
//! Every read returns a value snapshot. Callers never hold references into
//! the cache.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::core_types::{IdentityId, SessionId};
use crate::link::models::AccountLink;
use crate::store::{LinkStore, StoreError};

type Key = (String, IdentityId);

pub struct AccountLinkCache {
    store: Arc<dyn LinkStore>,
    entries: DashMap<Key, Arc<Mutex<AccountLink>>>,
}

impl AccountLinkCache {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    /// Shared handle for one link, loading it on first touch.
    ///
    /// Identities the store has never seen get a fresh unauthorized link,
    /// so every identity the world hands us has exactly one entry.
    async fn shared_entry(
        &self,
        app_key: &str,
        identity: IdentityId,
    ) -> Result<Arc<Mutex<AccountLink>>, StoreError> {
        let key = (app_key.to_string(), identity);
        if let Some(entry) = self.entries.get(&key) {
            return Ok(entry.value().clone());
        }

        // Load outside the map lock. Concurrent loaders may each reach
        // here; or_insert_with lets the first insert win and the rest
        // adopt it, dropping their own load.
        let loaded = self
            .store
            .get_link(app_key, identity)
            .await?
            .unwrap_or_else(|| AccountLink::unauthorized(app_key, identity));

        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)))
            .clone();
        Ok(entry)
    }

    /// Snapshot of the link for this identity (synthesized unauthorized if
    /// nobody has seen it before).
    pub async fn get(
        &self,
        app_key: &str,
        identity: IdentityId,
    ) -> Result<AccountLink, StoreError> {
        let entry = self.shared_entry(app_key, identity).await?;
        let link = entry.lock().await;
        Ok(link.clone())
    }

    /// Record a granted token + remote account and persist. Returns the
    /// updated snapshot.
    pub async fn authorize(
        &self,
        app_key: &str,
        identity: IdentityId,
        token: &str,
        remote_account: &str,
    ) -> Result<AccountLink, StoreError> {
        let entry = self.shared_entry(app_key, identity).await?;
        let mut link = entry.lock().await;
        link.token = token.to_string();
        link.remote_account = remote_account.to_string();
        link.touch();
        self.store.upsert_link(&link).await?;
        Ok(link.clone())
    }

    /// Drop a token the ledger has rejected. No-op when the cached token
    /// differs from `stale_token`: a re-authorization already replaced it
    /// and must not be clobbered by a late rejection.
    pub async fn invalidate_token(
        &self,
        app_key: &str,
        identity: IdentityId,
        stale_token: &str,
    ) -> Result<(), StoreError> {
        let entry = self.shared_entry(app_key, identity).await?;
        let mut link = entry.lock().await;
        if link.token != stale_token {
            tracing::debug!(identity = %identity, "token already rotated, skipping invalidation");
            return Ok(());
        }
        link.token.clear();
        link.touch();
        self.store.upsert_link(&link).await?;
        Ok(())
    }

    /// True exactly once per (identity, session), cluster-wide.
    ///
    /// The cached marker answers repeats cheaply; on a cache miss the store
    /// is re-read before claiming the session as new, so two processes
    /// serving the same user agree on who saw the session first.
    pub async fn is_new_session(
        &self,
        app_key: &str,
        identity: IdentityId,
        session: SessionId,
    ) -> Result<bool, StoreError> {
        let entry = self.shared_entry(app_key, identity).await?;
        let mut link = entry.lock().await;
        if link.last_session == Some(session) {
            return Ok(false);
        }

        if let Some(stored) = self.store.get_link(app_key, identity).await? {
            if stored.last_session == Some(session) {
                link.last_session = Some(session);
                link.updated_at = stored.updated_at;
                return Ok(false);
            }
        }

        link.last_session = Some(session);
        link.touch();
        self.store.upsert_link(&link).await?;
        Ok(true)
    }

    /// Drop cached entries for an identity across all app keys (logout).
    /// The store keeps the link; the next touch reloads it.
    pub fn evict(&self, identity: IdentityId) {
        self.entries.retain(|(_, id), _| *id != identity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
