//! GridPay - Virtual World Money Module
//!
//! Bridges an in-world economy to an external currency ledger over HTTP,
//! holding delivery obligations in escrow until the ledger commits.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (IdentityId, Amount, TransactionId)
//! - [`config`] - YAML configuration loading
//! - [`link`] - Identity-to-ledger-account links and their cache
//! - [`store`] - Persistence seams (in-memory and PostgreSQL)
//! - [`host`] - World-side seams: user lookup, item delivery, notifications
//! - [`ledger`] - Remote ledger transport (HTTP client + trait)
//! - [`escrow`] - Asset escrow state machine and registry
//! - [`txn`] - Transfer submission and completion handling
//! - [`auth`] - Account authorization flow (link URL + code exchange)
//! - [`login`] - Login-time balance push dedup
//! - [`http`] - Callback HTTP server
//! - [`logging`] - tracing setup

// Core types - must be first!
pub mod core_types;

// Ambient plumbing
pub mod config;
pub mod logging;

// Account links and persistence
pub mod link;
pub mod store;

// World and ledger seams
pub mod host;
pub mod ledger;

// Money movement
pub mod auth;
pub mod escrow;
pub mod login;
pub mod txn;

// Callback surface
pub mod http;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{Amount, IdentityId, SessionId, TimestampMs, TransactionId};
pub use escrow::{AssetRegistry, AssetState, EscrowAsset, EscrowError, ItemRef, SaleKind, StepReply};
pub use ledger::{DispatchOutcome, LedgerTransport, TransportError};
pub use link::{AccountLink, AccountLinkCache};
pub use login::LoginBalanceDedup;
pub use store::{LinkStore, StoreError, TxnStore};
pub use txn::{
    CompletionPayload, Outcome, TransactionCoordinator, TransferSpec, TxnError, TxnRecord,
    TxnStatus,
};
