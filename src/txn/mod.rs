//! Transaction layer: submission, completion, login glue
//!
//! The world side asks for a transfer ([`types::TransferSpec`]); the
//! [`coordinator::TransactionCoordinator`] validates it, registers any
//! escrow, records it, and dispatches it to the ledger. The ledger answers
//! asynchronously through the completion callback, which
//! [`outcome::classify`] turns into notifications and a settled record.

pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod types;

pub use coordinator::TransactionCoordinator;
pub use error::TxnError;
pub use outcome::{CompletionPayload, FailureKind, Outcome, classify};
pub use types::{AssetSpec, CallbackUrls, TransferSpec, TxnRecord, TxnStatus};
