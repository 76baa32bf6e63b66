//! Account link record

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core_types::{IdentityId, SessionId, TimestampMs};

/// One identity's link to its remote ledger account.
///
/// A link exists for every identity the module has seen, authorized or not;
/// an empty `token` means the user has not (or no longer) granted this app
/// access to their ledger account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLink {
    /// App key this link was granted under. One identity can hold separate
    /// links for separate app registrations.
    pub app_key: String,
    pub identity: IdentityId,
    /// Account id on the remote ledger. Empty until first authorization.
    pub remote_account: String,
    /// Bearer token for ledger calls on this user's behalf. Empty means
    /// unauthorized.
    pub token: String,
    /// Most recent session observed for this identity.
    pub last_session: Option<SessionId>,
    pub updated_at: TimestampMs,
}

impl AccountLink {
    /// Fresh link for an identity that has never authorized this app.
    pub fn unauthorized(app_key: &str, identity: IdentityId) -> Self {
        Self {
            app_key: app_key.to_string(),
            identity,
            remote_account: String::new(),
            token: String::new(),
            last_session: None,
            updated_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_authorized(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis();
    }
}

// Token is a bearer secret; keep it out of Display (Debug is for tests).
impl fmt::Display for AccountLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AccountLink[{}/{} remote={} authorized={}]",
            self.app_key,
            self.identity,
            if self.remote_account.is_empty() {
                "-"
            } else {
                &self.remote_account
            },
            self.is_authorized()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_unauthorized_link() {
        let id = Uuid::new_v4();
        let link = AccountLink::unauthorized("app-1", id);
        assert!(!link.is_authorized());
        assert!(link.remote_account.is_empty());
        assert_eq!(link.identity, id);
        assert!(link.last_session.is_none());
    }

    #[test]
    fn test_display_hides_token() {
        let mut link = AccountLink::unauthorized("app-1", Uuid::new_v4());
        link.token = "super-secret".to_string();
        let shown = format!("{}", link);
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("authorized=true"));
    }
}
