//! Completion-callback interpretation
//!
//! The ledger reports each transaction's outcome with a `success` flag plus
//! two strings: `status` says how far the transaction got ("queued" means
//! it entered the processing queue; anything else failed earlier), and
//! `reason` says why. [`classify`] maps the combinations onto actions; the
//! string values are the ledger's wire contract and must match exactly.

use serde::Deserialize;

use crate::core_types::{Amount, IdentityId, TransactionId};

/// Body of `POST /callback/transaction`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionPayload {
    pub txn_id: TransactionId,
    pub success: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
    /// Sender's ending balance; only present on success without an asset.
    #[serde(default)]
    pub balance: Option<Amount>,
    /// Party identities; older ledger versions omit them, in which case
    /// the stored transaction record fills them in.
    #[serde(default)]
    pub sender: Option<IdentityId>,
    #[serde(default)]
    pub recipient: Option<IdentityId>,
}

/// A failure the ledger named explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InsufficientBalance,
    /// Queued but the queue could not finish it
    QueueProcessing,
    /// Never made it into the queue
    QueuingFailed,
    SenderLocked,
    RecipientBlocked,
    UnknownRecipient,
}

impl FailureKind {
    /// What the affected user gets told.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::InsufficientBalance => {
                "Transfer failed: insufficient balance to cover this transfer."
            }
            FailureKind::QueueProcessing => {
                "Transfer failed while processing. Please try again."
            }
            FailureKind::QueuingFailed => {
                "Transfer could not be queued. Please try again."
            }
            FailureKind::SenderLocked => {
                "Transfer failed: your account cannot spend right now. Please contact support."
            }
            FailureKind::RecipientBlocked => {
                "Transfer failed: the recipient's account cannot receive funds."
            }
            FailureKind::UnknownRecipient => {
                "Transfer failed: the recipient has no ledger account."
            }
        }
    }

    /// Retrying the same transfer could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::QueueProcessing | FailureKind::QueuingFailed
        )
    }
}

/// What a completion callback means for this side.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Funds moved. `resubmitted` marks a queue retry of an exchange the
    /// ledger had already applied; `unexpected_reason` carries a success
    /// reason outside the contract (worth a log line, nothing more).
    Applied {
        resubmitted: bool,
        unexpected_reason: Option<String>,
    },
    /// In the queue, outcome still open; a later callback settles it.
    QueuedPending,
    /// Definitive failure; retrying unchanged will fail again.
    PermanentFailure(FailureKind),
    /// Failed for now; the user may retry.
    TransientFailure(FailureKind),
    /// Lost a duplicate-submission race pre-queue. The surviving
    /// submission's own callback settles the exchange, so nobody is told.
    DuplicateRace,
    /// Combination outside the contract. Treated as a failure, flagged
    /// loudly for operators.
    Defect { reason: String },
}

pub fn classify(payload: &CompletionPayload) -> Outcome {
    if payload.success {
        let resubmitted = payload.reason == "resubmitted";
        let unexpected_reason = if resubmitted || payload.reason == "success" {
            None
        } else {
            Some(payload.reason.clone())
        };
        return Outcome::Applied {
            resubmitted,
            unexpected_reason,
        };
    }

    if payload.status == "queued" {
        return match payload.reason.as_str() {
            "insufficient balance" => {
                Outcome::PermanentFailure(FailureKind::InsufficientBalance)
            }
            "pending" => Outcome::QueuedPending,
            _ => Outcome::TransientFailure(FailureKind::QueueProcessing),
        };
    }

    match payload.status.as_str() {
        "queuing-failed" => Outcome::TransientFailure(FailureKind::QueuingFailed),
        "failed" => Outcome::DuplicateRace,
        "cannot-spend" => Outcome::PermanentFailure(FailureKind::SenderLocked),
        "cannot-receive" => Outcome::PermanentFailure(FailureKind::RecipientBlocked),
        "unknown-merchant" => Outcome::PermanentFailure(FailureKind::UnknownRecipient),
        _ => Outcome::Defect {
            reason: format!("status={} reason={}", payload.status, payload.reason),
        },
    }
}
