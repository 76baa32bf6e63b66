//! Escrow asset state machine states

use std::fmt;

/// Escrow asset FSM states
///
/// Normal flow:
/// ```text
/// CREATED ──enact──▶ ENACT_PENDING ──delivered──▶ ENACTED ──consume──▶ CONSUMED
///    │                     │                         │
///    └─────cancel──────────┴──────────cancel─────────┘──▶ CANCELLED
/// ```
///
/// `CONSUMED` and `CANCELLED` are terminal; callbacks that arrive after a
/// terminal state are rejected without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum AssetState {
    /// Registered locally, no enact callback seen yet
    Created = 0,
    /// Enact received, world-side delivery not finished (retryable)
    EnactPending = 10,
    /// Delivery done, waiting for the ledger to commit
    Enacted = 20,
    /// Ledger committed; funds moved (terminal)
    Consumed = 30,
    /// Rolled back before commit (terminal)
    Cancelled = -10,
}

impl AssetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetState::Consumed | AssetState::Cancelled)
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(AssetState::Created),
            10 => Some(AssetState::EnactPending),
            20 => Some(AssetState::Enacted),
            30 => Some(AssetState::Consumed),
            -10 => Some(AssetState::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetState::Created => "CREATED",
            AssetState::EnactPending => "ENACT_PENDING",
            AssetState::Enacted => "ENACTED",
            AssetState::Consumed => "CONSUMED",
            AssetState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for AssetState {
    type Error = ();

    fn try_from(id: i16) -> Result<Self, Self::Error> {
        AssetState::from_id(id).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AssetState; 5] = [
        AssetState::Created,
        AssetState::EnactPending,
        AssetState::Enacted,
        AssetState::Consumed,
        AssetState::Cancelled,
    ];

    #[test]
    fn test_id_roundtrip() {
        for state in ALL {
            assert_eq!(AssetState::from_id(state.id()), Some(state));
            assert_eq!(AssetState::try_from(state.id()), Ok(state));
        }
    }

    #[test]
    fn test_unknown_id_rejected() {
        assert_eq!(AssetState::from_id(99), None);
        assert!(AssetState::try_from(-99).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(AssetState::Consumed.is_terminal());
        assert!(AssetState::Cancelled.is_terminal());
        assert!(!AssetState::Created.is_terminal());
        assert!(!AssetState::EnactPending.is_terminal());
        assert!(!AssetState::Enacted.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(AssetState::EnactPending.to_string(), "ENACT_PENDING");
        assert_eq!(AssetState::Cancelled.to_string(), "CANCELLED");
    }
}
