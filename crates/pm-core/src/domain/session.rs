// ============================================================================
// PM Core - Session Entity
// File: crates/pm-core/src/domain/session.rs
// Description: One authenticated login, revocable and sliding-expiry
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Server-side record of one login.
///
/// A session is active iff it has not been revoked and its expiry lies in
/// the future. Revocation is terminal: nothing clears `revoked_at` once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(session_id: String, user_id: i64, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            session_id,
            user_id,
            created_at: now,
            expires_at: now + window,
            last_seen: now,
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && self.expires_at > now
    }

    /// Slides the expiry to `now + window`. Returns `false` and leaves the
    /// record untouched when the session is no longer active.
    pub fn touch(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if !self.is_active_at(now) {
            return false;
        }
        self.last_seen = now;
        self.expires_at = now + window;
        true
    }

    /// Idempotent; only the first call changes the record.
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
            self.last_seen = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> Session {
        Session::new("sid".into(), 7, now, Duration::minutes(30))
    }

    #[test]
    fn test_new_session_is_active_until_window_ends() {
        let now = Utc::now();
        let s = session(now);
        assert!(s.is_active_at(now));
        assert!(s.is_active_at(now + Duration::minutes(29)));
        assert!(!s.is_active_at(now + Duration::minutes(30)));
    }

    #[test]
    fn test_touch_slides_expiry() {
        let now = Utc::now();
        let mut s = session(now);
        let later = now + Duration::minutes(20);
        assert!(s.touch(later, Duration::minutes(30)));
        assert_eq!(s.expires_at, later + Duration::minutes(30));
        assert_eq!(s.last_seen, later);
    }

    #[test]
    fn test_touch_does_not_revive_expired_session() {
        let now = Utc::now();
        let mut s = session(now);
        let too_late = now + Duration::minutes(31);
        assert!(!s.touch(too_late, Duration::minutes(30)));
        assert!(!s.is_active_at(too_late));
    }

    #[test]
    fn test_revoke_is_terminal_and_idempotent() {
        let now = Utc::now();
        let mut s = session(now);
        s.revoke(now);
        let first = s.clone();
        s.revoke(now + Duration::minutes(1));
        assert_eq!(s, first);
        assert!(!s.touch(now, Duration::minutes(30)));
        assert!(!s.is_active_at(now));
    }
}
