//! HTTP client for the remote ledger API

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::core_types::{Amount, IdentityId};
use crate::ledger::{
    DispatchOutcome, LedgerTransport, TokenGrant, TransferSubmission, TransportError,
};
use crate::link::models::AccountLink;

pub struct HttpLedgerClient {
    cfg: LedgerConfig,
    client: reqwest::Client,
}

impl HttpLedgerClient {
    pub fn new(cfg: LedgerConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { cfg, client })
    }

    async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R, TransportError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "ledger POST");
        let response = self.client.post(&url).json(body).send().await?;
        Ok(response.json::<R>().await?)
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    app_key: &'a str,
    app_secret: &'a str,
    token: &'a str,
    #[serde(flatten)]
    submission: &'a TransferSubmission,
}

#[derive(Deserialize)]
struct SubmitReply {
    success: bool,
    #[serde(default)]
    reason: String,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    app_key: &'a str,
    app_secret: &'a str,
    identity: IdentityId,
    code: &'a str,
}

#[derive(Deserialize)]
struct ExchangeReply {
    success: bool,
    #[serde(default)]
    token: String,
    #[serde(default)]
    remote_account: String,
    #[serde(default)]
    reason: String,
}

#[derive(Serialize)]
struct BalanceRequest<'a> {
    app_key: &'a str,
    remote_account: &'a str,
    token: &'a str,
}

#[derive(Deserialize)]
struct BalanceReply {
    success: bool,
    #[serde(default)]
    balance: Amount,
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl LedgerTransport for HttpLedgerClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit_transfer(
        &self,
        submission: &TransferSubmission,
        token: &str,
    ) -> DispatchOutcome {
        let request = SubmitRequest {
            app_key: &self.cfg.app_key,
            app_secret: &self.cfg.app_secret,
            token,
            submission,
        };
        match self
            .post_json::<_, SubmitReply>("/transact/u2u", &request)
            .await
        {
            Ok(reply) if reply.success => DispatchOutcome::Accepted,
            Ok(reply) => {
                warn!(txn_id = %submission.txn_id, reason = %reply.reason, "ledger refused submission");
                DispatchOutcome::Failed(reply.reason)
            }
            Err(e) => {
                warn!(txn_id = %submission.txn_id, error = %e, "submission dispatch failed");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn exchange_code(
        &self,
        identity: IdentityId,
        code: &str,
    ) -> Result<TokenGrant, TransportError> {
        let request = ExchangeRequest {
            app_key: &self.cfg.app_key,
            app_secret: &self.cfg.app_secret,
            identity,
            code,
        };
        let reply: ExchangeReply = self.post_json("/oauth/access-token", &request).await?;
        if !reply.success {
            return Err(TransportError::Rejected(reply.reason));
        }
        if reply.token.is_empty() {
            return Err(TransportError::Rejected(
                "exchange succeeded without a token".to_string(),
            ));
        }
        Ok(TokenGrant {
            token: reply.token,
            remote_account: reply.remote_account,
        })
    }

    async fn query_balance(&self, link: &AccountLink) -> Result<Amount, TransportError> {
        let request = BalanceRequest {
            app_key: &self.cfg.app_key,
            remote_account: &link.remote_account,
            token: &link.token,
        };
        let reply: BalanceReply = self.post_json("/balance", &request).await?;
        if reply.success {
            return Ok(reply.balance);
        }
        // "invalid-token" is the ledger's signal that the grant was revoked
        if reply.reason == "invalid-token" {
            return Err(TransportError::TokenRejected);
        }
        Err(TransportError::Rejected(reply.reason))
    }
}
