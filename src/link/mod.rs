//! Account link layer
//!
//! An account link ties one world-side identity to its account on the
//! remote currency ledger: the remote account id, the authorization token
//! obtained through the OAuth-style flow, and the last session seen.
//!
//! [`cache::AccountLinkCache`] is the single concurrency-safe entry point;
//! it fronts the persistent [`crate::store::LinkStore`] and hands out value
//! snapshots, never references into shared state.

pub mod cache;
pub mod models;

pub use cache::AccountLinkCache;
pub use models::AccountLink;
