//! Escrow error types

use thiserror::Error;

use crate::core_types::TransactionId;
use crate::escrow::state::AssetState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscrowError {
    #[error("no escrow asset for transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("escrow asset already registered for transaction {0}")]
    DuplicateTransaction(TransactionId),

    /// The asset settled; the callback is late or duplicated and must not
    /// cause side effects.
    #[error("transaction {txn_id} already settled in state {state}")]
    TerminalState {
        txn_id: TransactionId,
        state: AssetState,
    },

    /// The remote skipped a step (consume before enact). Points at a bug
    /// on one side or the other; never auto-repaired.
    #[error("transaction {txn_id} cannot move {from} -> {to}")]
    InvalidTransition {
        txn_id: TransactionId,
        from: AssetState,
        to: AssetState,
    },
}

impl EscrowError {
    pub fn code(&self) -> &'static str {
        match self {
            EscrowError::UnknownTransaction(_) => "UNKNOWN_TRANSACTION",
            EscrowError::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
            EscrowError::TerminalState { .. } => "TERMINAL_STATE",
            EscrowError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}
