// ============================================================================
// PM Core - Session Authority
// File: crates/pm-core/src/services/session_authority.rs
// ============================================================================
//! Issues, validates, extends and revokes sessions across the durable store
//! and the in-process fallback.
//!
//! Precedence rule: whenever the durable store answers, its answer is final.
//! The volatile store is read only when the durable query itself fails, and it
//! is never allowed to turn a durable "inactive" into "active". A revocation
//! made by this process is final even if the durable write has not landed yet.

use pm_shared::constants::DEFAULT_STORE_OPERATION_TIMEOUT_SECS;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::VolatileSessionStore;
use crate::error::{DomainError, StoreError};
use crate::repositories::SessionRepository;

pub struct SessionAuthority {
    durable: Arc<dyn SessionRepository>,
    fallback: Arc<VolatileSessionStore>,
    bypass_db_session: bool,
    store_timeout: Duration,
}

impl SessionAuthority {
    pub fn new(
        durable: Arc<dyn SessionRepository>,
        fallback: Arc<VolatileSessionStore>,
        bypass_db_session: bool,
    ) -> Self {
        if bypass_db_session {
            warn!(
                "bypass_db_session is ENABLED: session activity is not checked, \
                 only token signature and expiry. Never use this outside isolated development."
            );
        }
        Self {
            durable,
            fallback,
            bypass_db_session,
            store_timeout: Duration::from_secs(DEFAULT_STORE_OPERATION_TIMEOUT_SECS),
        }
    }

    /// Upper bound for one durable store call, connect included. A call that
    /// runs over counts as the store being unreachable.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass_db_session
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "session {} timed out after {:?}",
                operation, self.store_timeout
            ))),
        }
    }

    /// Starts a session for `user_id` and returns its id.
    ///
    /// The id is registered in the fallback before the durable write, so a
    /// failed write leaves a degraded but usable session. Only a duplicate id
    /// is surfaced as an error.
    pub async fn start_session(&self, user_id: i64) -> Result<String, DomainError> {
        let session_id = pm_security::generate_session_id();
        let inserted = self.fallback.start(&session_id);

        match self
            .bounded("create", self.durable.create(&session_id, user_id))
            .await
        {
            Ok(()) => {
                debug!("Session persisted for user {}", user_id);
            }
            Err(StoreError::DuplicateSession(sid)) => {
                error!("Generated session id collided with an existing session");
                // Leave the other session's entry alone.
                if inserted {
                    self.fallback.discard(&session_id);
                }
                return Err(DomainError::DuplicateSession(sid));
            }
            Err(e) => {
                warn!(
                    "Session for user {} not persisted, running on fallback only: {}",
                    user_id, e
                );
            }
        }

        info!("Session started for user {}", user_id);
        Ok(session_id)
    }

    /// `true` iff the session may be used for this request. A durable hit
    /// also slides the session's expiry, best-effort.
    pub async fn validate(&self, session_id: &str) -> bool {
        if self.bypass_db_session {
            debug!("bypass_db_session enabled: skipping session check");
            return true;
        }
        if session_id.is_empty() {
            return false;
        }

        // A revocation seen by this process is final, whatever the durable
        // row says.
        if self.fallback.is_revoked(session_id) {
            if self.fallback.is_unsynced(session_id) {
                self.sync_revocation(session_id).await;
            }
            debug!("Session revoked in this process");
            return false;
        }

        match self
            .bounded("lookup", self.durable.is_active(session_id))
            .await
        {
            Ok(true) => {
                match self.bounded("touch", self.durable.touch(session_id)).await {
                    Ok(true) => {}
                    Ok(false) => debug!("Session touch matched no active row"),
                    Err(e) => warn!("Session touch failed, ignoring: {}", e),
                }
                true
            }
            Ok(false) => {
                debug!("Session inactive in durable store");
                false
            }
            Err(e) => {
                let active = self.fallback.is_active(session_id);
                warn!(
                    "Durable session check failed ({}); fallback store reports active={}",
                    e, active
                );
                active
            }
        }
    }

    /// Revokes in the fallback first, then durably. A failed durable write is
    /// retried on the next validation of the same id; the in-memory
    /// revocation is never rolled back.
    pub async fn revoke_session(&self, session_id: &str) {
        if session_id.is_empty() {
            return;
        }
        self.fallback.revoke(session_id);
        self.fallback.mark_unsynced(session_id);
        self.sync_revocation(session_id).await;
    }

    async fn sync_revocation(&self, session_id: &str) {
        match self.bounded("revoke", self.durable.revoke(session_id)).await {
            Ok(()) => {
                self.fallback.mark_synced(session_id);
                info!("Session revoked");
            }
            Err(e) => warn!("Durable session revoke failed, revoked in memory only: {}", e),
        }
    }
}
