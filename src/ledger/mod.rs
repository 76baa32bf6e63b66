//! Remote currency ledger transport
//!
//! Everything that crosses the wire to the ledger goes through
//! [`LedgerTransport`]: transfer submission, authorization-code exchange,
//! and balance queries. [`http::HttpLedgerClient`] is the real
//! implementation; tests swap in [`mock::MockLedger`].
//!
//! Submission is fire-and-interpret: the ledger answers whether it
//! *accepted* the transfer, and the actual outcome arrives later through
//! the completion callback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::{Amount, IdentityId, TransactionId};
use crate::link::models::AccountLink;
use crate::txn::types::{CallbackUrls, TransferDetails};

pub mod http;

pub use http::HttpLedgerClient;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(String),

    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    /// The ledger no longer honors the token we sent. The caller must
    /// invalidate the cached token and ask the user to re-authorize.
    #[error("ledger rejected the authorization token")]
    TokenRejected,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

/// Did the ledger take the submission? Transport failures and synchronous
/// rejections both land in `Failed`; acceptance says nothing about the
/// final outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Accepted,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DispatchOutcome::Accepted)
    }
}

/// Token + account granted by a successful authorization-code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub token: String,
    pub remote_account: String,
}

/// One transfer as submitted to the ledger.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferSubmission {
    pub txn_id: TransactionId,
    pub sender: IdentityId,
    pub recipient: IdentityId,
    pub amount: Amount,
    pub description: String,
    /// Free-form context recorded ledger-side with the transaction.
    pub details: TransferDetails,
    /// Tells the ledger to drive the enact/consume/cancel handshake.
    pub asset_attached: bool,
    pub callbacks: CallbackUrls,
}

#[async_trait]
pub trait LedgerTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit on behalf of the sender identified by `token`.
    async fn submit_transfer(
        &self,
        submission: &TransferSubmission,
        token: &str,
    ) -> DispatchOutcome;

    /// Exchange the code from the authorization redirect for a token.
    async fn exchange_code(
        &self,
        identity: IdentityId,
        code: &str,
    ) -> Result<TokenGrant, TransportError>;

    async fn query_balance(&self, link: &AccountLink) -> Result<Amount, TransportError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable in-process ledger: records submissions, with knobs for
    /// dispatch failure, token rejection, and the reported balance.
    pub struct MockLedger {
        pub submissions: Mutex<Vec<TransferSubmission>>,
        pub submit_count: AtomicUsize,
        pub balance_count: AtomicUsize,
        pub fail_submit: Mutex<bool>,
        pub reject_token: Mutex<bool>,
        pub balance: Mutex<Amount>,
    }

    impl MockLedger {
        pub fn new() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                submit_count: AtomicUsize::new(0),
                balance_count: AtomicUsize::new(0),
                fail_submit: Mutex::new(false),
                reject_token: Mutex::new(false),
                balance: Mutex::new(0),
            }
        }

        pub fn set_fail_submit(&self, fail: bool) {
            *self.fail_submit.lock().unwrap() = fail;
        }

        pub fn set_reject_token(&self, reject: bool) {
            *self.reject_token.lock().unwrap() = reject;
        }

        pub fn set_balance(&self, balance: Amount) {
            *self.balance.lock().unwrap() = balance;
        }

        pub fn last_submission(&self) -> Option<TransferSubmission> {
            self.submissions.lock().unwrap().last().cloned()
        }
    }

    impl Default for MockLedger {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LedgerTransport for MockLedger {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn submit_transfer(
            &self,
            submission: &TransferSubmission,
            _token: &str,
        ) -> DispatchOutcome {
            self.submit_count.fetch_add(1, Ordering::SeqCst);
            // Record even refused submissions; tests correlate through them
            self.submissions.lock().unwrap().push(submission.clone());
            if *self.fail_submit.lock().unwrap() {
                return DispatchOutcome::Failed("mock dispatch failure".to_string());
            }
            DispatchOutcome::Accepted
        }

        async fn exchange_code(
            &self,
            _identity: IdentityId,
            code: &str,
        ) -> Result<TokenGrant, TransportError> {
            if code == "bad-code" {
                return Err(TransportError::Rejected("unknown code".to_string()));
            }
            Ok(TokenGrant {
                token: format!("token-for-{}", code),
                remote_account: "mock-account".to_string(),
            })
        }

        async fn query_balance(&self, _link: &AccountLink) -> Result<Amount, TransportError> {
            self.balance_count.fetch_add(1, Ordering::SeqCst);
            if *self.reject_token.lock().unwrap() {
                return Err(TransportError::TokenRejected);
            }
            Ok(*self.balance.lock().unwrap())
        }
    }
}

#[cfg(test)]
pub use mock::MockLedger;
