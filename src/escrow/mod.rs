//! Two-phase escrow for remote-settled purchases
//!
//! A transfer that carries goods registers an [`asset::EscrowAsset`] before
//! submission. The remote ledger then drives it through HTTP callbacks:
//!
//! ```text
//!                       enact                     consume(balance)
//!   CREATED ─────────▶ ENACT_PENDING ─────────▶ ENACTED ─────────▶ CONSUMED
//!      │                    │    ▲                  │
//!      │                    └────┘ retry            │
//!      │                   (buyer offline /         │
//!      │                    delivery failed)        │
//!      └────────────── cancel ──────────────────────┴──▶ CANCELLED
//! ```
//!
//! Enact commits the world side (delivery), consume finalizes after the
//! ledger commits the funds, cancel rolls back. Ghost assets skip delivery
//! but still walk the same states, which lets plain transfers opt into the
//! two-phase handshake.

pub mod asset;
pub mod error;
pub mod reaper;
pub mod registry;
pub mod state;

pub use asset::{EscrowAsset, ItemRef, SaleKind};
pub use error::EscrowError;
pub use registry::{AssetRegistry, StepReply};
pub use state::AssetState;
