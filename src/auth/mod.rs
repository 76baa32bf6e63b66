//! Ledger account authorization flow
//!
//! Users grant this app access to their ledger account OAuth-style: we
//! hand them an authorize URL, the ledger redirects back to
//! `GET /callback/authorize` with a one-time code, and [`AuthFlow`]
//! exchanges the code for a token that lands in the link cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::LedgerConfig;
use crate::core_types::IdentityId;
use crate::ledger::{LedgerTransport, TransportError};
use crate::link::cache::AccountLinkCache;
use crate::link::models::AccountLink;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("code exchange failed: {0}")]
    Exchange(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct AuthFlow {
    app_key: String,
    ledger_base_url: String,
    callback_base: String,
    links: Arc<AccountLinkCache>,
    transport: Arc<dyn LedgerTransport>,
}

impl AuthFlow {
    pub fn new(
        cfg: &LedgerConfig,
        callback_base: &str,
        links: Arc<AccountLinkCache>,
        transport: Arc<dyn LedgerTransport>,
    ) -> Self {
        Self {
            app_key: cfg.app_key.clone(),
            ledger_base_url: cfg.base_url.trim_end_matches('/').to_string(),
            callback_base: callback_base.trim_end_matches('/').to_string(),
            links,
            transport,
        }
    }

    /// Where to send a user who has not authorized this app yet.
    pub fn authorize_url(&self, identity: IdentityId) -> String {
        format!(
            "{}/oauth/authorize?app_key={}&identity={}&return_to={}/callback/authorize",
            self.ledger_base_url, self.app_key, identity, self.callback_base
        )
    }

    /// Redeem the code from the authorization redirect and store the
    /// granted token on the identity's link.
    pub async fn exchange_code(
        &self,
        identity: IdentityId,
        code: &str,
    ) -> Result<AccountLink, AuthError> {
        let grant = self.transport.exchange_code(identity, code).await?;
        let link = self
            .links
            .authorize(&self.app_key, identity, &grant.token, &grant.remote_account)
            .await?;
        info!(identity = %identity, remote_account = %link.remote_account, "ledger account linked");
        Ok(link)
    }
}
