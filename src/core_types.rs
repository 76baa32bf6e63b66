//! Core type definitions shared across gridpay
//!
//! Semantic aliases for the primitive types flowing between the world-side
//! host, the link cache, and the remote ledger, plus the [`TransactionId`]
//! newtype that correlates every remote call with its callbacks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// World-side identity of a user (avatar).
///
/// # Constraints
/// - Assigned by the host simulator, stable across sessions
/// - Never shown to the remote ledger as an account number; the ledger
///   only sees it as an opaque correlation key
pub type IdentityId = Uuid;

/// One presence of a user on the host.
///
/// # Usage
/// A new session id means the user (re)logged in; the link cache uses it
/// to fire once-per-session work such as the login balance push.
pub type SessionId = Uuid;

/// Currency amount in the ledger's smallest unit.
///
/// # Constraints
/// - Integral; the remote ledger deals in whole units only
/// - Signed so balance deltas can be expressed, but every submitted
///   transfer amount must be strictly positive
pub type Amount = i64;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Identifier of one remote ledger transaction.
///
/// Minted locally at submission time and echoed back by every callback the
/// ledger sends, so retries and callbacks stay idempotent per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

impl From<Uuid> for TransactionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
