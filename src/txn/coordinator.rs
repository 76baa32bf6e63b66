//! Transaction coordinator
//!
//! Owns the submit path (validate, gate on authorization, register escrow,
//! record, dispatch) and the completion path (classify the callback, tell
//! the right people, settle the record). Everything user-visible funnels
//! through here; the HTTP layer only parses and forwards.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::AuthFlow;
use crate::core_types::{Amount, IdentityId, SessionId, TransactionId};
use crate::escrow::asset::EscrowAsset;
use crate::escrow::registry::AssetRegistry;
use crate::ledger::{DispatchOutcome, LedgerTransport, TransferSubmission, TransportError};
use crate::link::cache::AccountLinkCache;
use crate::link::models::AccountLink;
use crate::login::LoginBalanceDedup;
use crate::store::TxnStore;
use crate::txn::error::TxnError;
use crate::txn::outcome::{CompletionPayload, Outcome, classify};
use crate::txn::types::{CallbackUrls, TransferSpec, TxnRecord, TxnStatus};

pub struct TransactionCoordinator {
    app_key: String,
    callbacks: CallbackUrls,
    links: Arc<AccountLinkCache>,
    registry: Arc<AssetRegistry>,
    txns: Arc<dyn TxnStore>,
    transport: Arc<dyn LedgerTransport>,
    notifier: Arc<dyn crate::host::UserNotifier>,
    auth: Arc<AuthFlow>,
    dedup: Arc<LoginBalanceDedup>,
}

impl TransactionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        app_key: &str,
        callbacks: CallbackUrls,
        links: Arc<AccountLinkCache>,
        registry: Arc<AssetRegistry>,
        txns: Arc<dyn TxnStore>,
        transport: Arc<dyn LedgerTransport>,
        notifier: Arc<dyn crate::host::UserNotifier>,
        auth: Arc<AuthFlow>,
        dedup: Arc<LoginBalanceDedup>,
    ) -> Self {
        Self {
            app_key: app_key.to_string(),
            callbacks,
            links,
            registry,
            txns,
            transport,
            notifier,
            auth,
            dedup,
        }
    }

    /// Authorized-link gate. Unauthorized users get the authorize URL
    /// pushed at them; nothing is submitted on their behalf.
    async fn ensure_authorized(&self, identity: IdentityId) -> Result<AccountLink, TxnError> {
        let link = self.links.get(&self.app_key, identity).await?;
        if link.is_authorized() {
            return Ok(link);
        }
        let url = self.auth.authorize_url(identity);
        self.notifier
            .alert(
                identity,
                &format!("To use money here, authorize this world first: {}", url),
            )
            .await;
        Err(TxnError::SenderNotAuthorized)
    }

    /// Submit a transfer to the ledger. Self-transfers are legal; the
    /// ledger books them like any other exchange.
    pub async fn submit_transfer(&self, spec: TransferSpec) -> Result<TransactionId, TxnError> {
        if spec.amount <= 0 {
            return Err(TxnError::InvalidAmount);
        }
        let link = self.ensure_authorized(spec.sender).await?;

        let txn_id = TransactionId::new();

        if let Some(asset_spec) = &spec.asset {
            let asset = match &asset_spec.item {
                Some(item) => EscrowAsset::delivery(
                    txn_id,
                    spec.sender,
                    spec.recipient,
                    item.clone(),
                    asset_spec.sale_kind,
                    spec.amount,
                ),
                None => EscrowAsset::ghost(txn_id, spec.sender, spec.recipient, spec.amount),
            };
            self.registry.create(asset)?;
        }

        // Record before dispatch: a completion callback racing the HTTP
        // response must find this row.
        let record = TxnRecord::new(txn_id, &spec);
        if let Err(e) = self.txns.upsert_txn(&record).await {
            if spec.asset.is_some() {
                self.registry.remove(txn_id);
            }
            return Err(e.into());
        }

        let submission = TransferSubmission {
            txn_id,
            sender: spec.sender,
            recipient: spec.recipient,
            amount: spec.amount,
            description: spec.description.clone(),
            details: spec.details.clone(),
            asset_attached: spec.asset.is_some(),
            callbacks: self.callbacks.clone(),
        };

        match self.transport.submit_transfer(&submission, &link.token).await {
            DispatchOutcome::Accepted => {
                info!(
                    txn_id = %txn_id,
                    sender = %spec.sender,
                    recipient = %spec.recipient,
                    amount = spec.amount,
                    asset = spec.asset.is_some(),
                    "transfer submitted"
                );
                Ok(txn_id)
            }
            DispatchOutcome::Failed(why) => {
                warn!(txn_id = %txn_id, reason = %why, "transfer dispatch failed");
                // Never reached the ledger; no callback will come for it.
                if spec.asset.is_some() {
                    self.registry.remove(txn_id);
                }
                self.txns.set_txn_status(txn_id, TxnStatus::Failed).await?;
                self.notifier
                    .alert(spec.sender, "Transfer failed to send. Please try again.")
                    .await;
                Err(TxnError::DispatchFailed(why))
            }
        }
    }

    /// Completion callback: the ledger's verdict on one submission.
    pub async fn on_transfer_completed(&self, payload: CompletionPayload) -> Result<(), TxnError> {
        let txn_id = payload.txn_id;

        // Party identities: the payload wins, the stored record fills gaps.
        let record = self.txns.get_txn(txn_id).await?;
        let (sender, recipient) = match (payload.sender, payload.recipient, &record) {
            (Some(s), Some(r), _) => (s, r),
            (s, r, Some(rec)) => (s.unwrap_or(rec.sender), r.unwrap_or(rec.recipient)),
            _ => {
                warn!(txn_id = %txn_id, "completion for unknown transaction, dropping");
                return Err(TxnError::UnknownTransaction(txn_id));
            }
        };

        let has_asset = self.registry.contains(txn_id);

        match classify(&payload) {
            Outcome::Applied {
                resubmitted,
                unexpected_reason,
            } => {
                if let Some(reason) = unexpected_reason {
                    warn!(txn_id = %txn_id, reason = %reason, "success with off-contract reason");
                }
                if resubmitted {
                    self.notifier
                        .alert(
                            sender,
                            "Your transfer had already been queued; it was not charged twice.",
                        )
                        .await;
                }
                if has_asset {
                    // Asset transfers get their balance with the consume step.
                    debug!(txn_id = %txn_id, "applied; balances deferred to consume");
                } else if let Some(balance) = payload.balance {
                    self.notifier.balance_update(sender, balance).await;
                    self.notifier.balance_update(recipient, balance).await;
                } else {
                    debug!(txn_id = %txn_id, "applied without a balance figure");
                }
                self.txns.set_txn_status(txn_id, TxnStatus::Succeeded).await?;
                info!(txn_id = %txn_id, "transfer completed");
            }
            Outcome::QueuedPending => {
                if !has_asset {
                    warn!(txn_id = %txn_id, "plain transfer reported pending; only asset transfers should wait");
                }
                self.txns.set_txn_status(txn_id, TxnStatus::Queued).await?;
                debug!(txn_id = %txn_id, "transfer queued, awaiting final callback");
            }
            Outcome::PermanentFailure(kind) => {
                self.notifier.alert(sender, kind.user_message()).await;
                self.txns.set_txn_status(txn_id, TxnStatus::Failed).await?;
                info!(txn_id = %txn_id, kind = ?kind, "transfer failed permanently");
            }
            Outcome::TransientFailure(kind) => {
                self.notifier.alert(sender, kind.user_message()).await;
                self.txns.set_txn_status(txn_id, TxnStatus::Failed).await?;
                info!(txn_id = %txn_id, kind = ?kind, "transfer failed, user may retry");
            }
            Outcome::DuplicateRace => {
                // The surviving submission's callback settles the exchange;
                // logged in full so a real bug can't hide behind this status.
                warn!(
                    txn_id = %txn_id,
                    status = %payload.status,
                    reason = %payload.reason,
                    "duplicate-submission race; user not notified"
                );
            }
            Outcome::Defect { reason } => {
                error!(txn_id = %txn_id, reason = %reason, "off-contract completion payload");
                self.notifier
                    .alert(sender, "Transfer failed. Please try again.")
                    .await;
                self.txns.set_txn_status(txn_id, TxnStatus::Failed).await?;
            }
        }

        Ok(())
    }

    /// Current balance from the ledger. A rejected token gets dropped from
    /// the cache and the user is sent back through authorization.
    pub async fn query_balance(&self, identity: IdentityId) -> Result<Amount, TxnError> {
        let link = self.ensure_authorized(identity).await?;
        match self.transport.query_balance(&link).await {
            Ok(balance) => Ok(balance),
            Err(TransportError::TokenRejected) => {
                self.links
                    .invalidate_token(&self.app_key, identity, &link.token)
                    .await?;
                let url = self.auth.authorize_url(identity);
                self.notifier
                    .alert(
                        identity,
                        &format!("Your ledger authorization expired. Re-authorize here: {}", url),
                    )
                    .await;
                Err(TxnError::Transport(TransportError::TokenRejected))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Login hook: on the first sighting of a session, push the balance
    /// and arm the dedup so the client's own probe right behind the login
    /// doesn't produce a second push.
    pub async fn on_login(&self, identity: IdentityId, session: SessionId) -> Result<(), TxnError> {
        if !self
            .links
            .is_new_session(&self.app_key, identity, session)
            .await?
        {
            debug!(identity = %identity, "session already seen, login push skipped");
            return Ok(());
        }

        self.dedup.mark_ignore_next(identity);
        match self.query_balance(identity).await {
            Ok(balance) => {
                self.notifier.balance_update(identity, balance).await;
                Ok(())
            }
            // Unauthorized users already got the authorize URL instead.
            Err(TxnError::SenderNotAuthorized) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Client-driven balance request. `None` means the probe landed inside
    /// the post-login dedup window and was swallowed.
    pub async fn on_balance_probe(&self, identity: IdentityId) -> Result<Option<Amount>, TxnError> {
        if self.dedup.consume_ignore_flag(identity) {
            debug!(identity = %identity, "balance probe suppressed after login push");
            return Ok(None);
        }
        let balance = self.query_balance(identity).await?;
        self.notifier.balance_update(identity, balance).await;
        Ok(Some(balance))
    }

    pub fn on_logout(&self, identity: IdentityId) {
        self.links.evict(identity);
        self.dedup.evict(identity);
        debug!(identity = %identity, "identity evicted on logout");
    }
}
