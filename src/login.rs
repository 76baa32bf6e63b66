//! Login balance-probe dedup
//!
//! On login the module pushes the user's balance itself, and the client
//! then asks for it again. [`LoginBalanceDedup`] suppresses that duplicate:
//! the login path marks the identity, and the first balance probe within
//! the window consumes the mark and gets skipped. One mark suppresses
//! exactly one probe; past the window a mark is inert.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

use crate::core_types::IdentityId;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

pub struct LoginBalanceDedup {
    window_ms: i64,
    /// identity -> mark timestamp (ms). Presence means one probe should
    /// be swallowed.
    markers: DashMap<IdentityId, i64>,
}

impl LoginBalanceDedup {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as i64,
            markers: DashMap::new(),
        }
    }

    /// Flag the identity so its next balance probe gets suppressed.
    /// Re-marking restarts the window.
    pub fn mark_ignore_next(&self, identity: IdentityId) {
        self.markers.insert(identity, Utc::now().timestamp_millis());
    }

    /// Take the mark if it is still fresh. True at most once per mark;
    /// an expired mark is inert and stays put untouched.
    pub fn consume_ignore_flag(&self, identity: IdentityId) -> bool {
        let now = Utc::now().timestamp_millis();
        // remove_if is atomic per entry, so concurrent probes cannot both
        // consume the same mark.
        self.markers
            .remove_if(&identity, |_, marked_at_ms| {
                now - *marked_at_ms < self.window_ms
            })
            .is_some()
    }

    /// Same recency condition as [`Self::consume_ignore_flag`], without
    /// taking the mark.
    pub fn exists_and_recent(&self, identity: IdentityId) -> bool {
        match self.markers.get(&identity) {
            Some(entry) => Utc::now().timestamp_millis() - *entry < self.window_ms,
            None => false,
        }
    }

    /// Logout cleanup.
    pub fn evict(&self, identity: IdentityId) {
        self.markers.remove(&identity);
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Age a mark artificially (tests only; avoids sleeping the window out).
    #[cfg(test)]
    fn backdate(&self, identity: IdentityId, ms: i64) {
        if let Some(mut entry) = self.markers.get_mut(&identity) {
            *entry -= ms;
        }
    }
}

impl Default for LoginBalanceDedup {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
