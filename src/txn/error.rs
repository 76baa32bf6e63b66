//! Transaction-layer error types

use thiserror::Error;

use crate::core_types::TransactionId;
use crate::escrow::error::EscrowError;
use crate::ledger::TransportError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum TxnError {
    /// Amounts must be strictly positive; rejected before any remote call.
    #[error("transfer amount must be positive")]
    InvalidAmount,

    /// The sender holds no usable token for this app.
    #[error("sender has not authorized this app on their ledger account")]
    SenderNotAuthorized,

    #[error("the ledger did not accept the submission: {0}")]
    DispatchFailed(String),

    #[error("no transaction record for {0}")]
    UnknownTransaction(TransactionId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("ledger transport error: {0}")]
    Transport(#[from] TransportError),
}

impl TxnError {
    pub fn code(&self) -> &'static str {
        match self {
            TxnError::InvalidAmount => "INVALID_AMOUNT",
            TxnError::SenderNotAuthorized => "SENDER_NOT_AUTHORIZED",
            TxnError::DispatchFailed(_) => "DISPATCH_FAILED",
            TxnError::UnknownTransaction(_) => "UNKNOWN_TRANSACTION",
            TxnError::Store(_) => "STORE_ERROR",
            TxnError::Escrow(e) => e.code(),
            TxnError::Transport(_) => "TRANSPORT_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            TxnError::InvalidAmount => 400,
            TxnError::SenderNotAuthorized => 403,
            TxnError::DispatchFailed(_) => 502,
            TxnError::UnknownTransaction(_) => 404,
            TxnError::Store(_) => 500,
            TxnError::Escrow(EscrowError::UnknownTransaction(_)) => 404,
            TxnError::Escrow(_) => 409,
            TxnError::Transport(_) => 502,
        }
    }
}
