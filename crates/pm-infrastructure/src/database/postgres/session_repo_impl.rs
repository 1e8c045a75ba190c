// ============================================================================
// PM Infrastructure - PostgreSQL Session Repository
// File: crates/pm-infrastructure/src/database/postgres/session_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

use pm_core::repositories::SessionRepository;
use pm_core::{Session, StoreError};

use super::classify;
use crate::database::connection::CandidateConnector;

/// Durable session store. Opens one connection per operation through the
/// candidate list; every timestamp comes from the application clock.
pub struct PgSessionRepository {
    connector: Arc<CandidateConnector>,
    window: Duration,
}

impl PgSessionRepository {
    pub fn new(connector: Arc<CandidateConnector>, window: Duration) -> Self {
        Self { connector, window }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    session_id: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            session_id: row.session_id,
            user_id: row.user_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_seen: row.last_seen,
            revoked_at: row.revoked_at,
        }
    }
}

async fn release(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        debug!("Closing session store connection failed: {}", e);
    }
}

const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (session_id, user_id, created_at, expires_at, last_seen, revoked_at)
    VALUES ($1, $2, $3, $4, $3, NULL)
"#;

const SELECT_SESSION: &str = r#"
    SELECT session_id, user_id, created_at, expires_at, last_seen, revoked_at
    FROM sessions
    WHERE session_id = $1
"#;

const TOUCH_SESSION: &str = r#"
    UPDATE sessions
    SET last_seen = $2, expires_at = $3
    WHERE session_id = $1 AND revoked_at IS NULL AND expires_at > $2
"#;

const REVOKE_SESSION: &str = r#"
    UPDATE sessions
    SET revoked_at = $2, last_seen = $2
    WHERE session_id = $1 AND revoked_at IS NULL
"#;

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session_id: &str, user_id: i64) -> Result<(), StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = INSERT_SESSION
        );
        async {
            let mut conn = self.connector.connect().await?;
            let now = Utc::now();
            let result = sqlx::query(INSERT_SESSION)
                .bind(session_id)
                .bind(user_id)
                .bind(now)
                .bind(now + self.window)
                .execute(&mut conn)
                .await;
            release(conn).await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(StoreError::DuplicateSession(session_id.to_string()))
                }
                Err(e) => {
                    warn!("Session insert failed: {}", e);
                    Err(classify(e))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn is_active(&self, session_id: &str) -> Result<bool, StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = SELECT_SESSION
        );
        async {
            let mut conn = self.connector.connect().await?;
            let result: Result<Option<SessionRow>, sqlx::Error> = sqlx::query_as(SELECT_SESSION)
                .bind(session_id)
                .fetch_optional(&mut conn)
                .await;
            release(conn).await;

            let row = result.map_err(classify)?;
            Ok(row
                .map(Session::from)
                .map(|s| s.is_active_at(Utc::now()))
                .unwrap_or(false))
        }
        .instrument(span)
        .await
    }

    async fn touch(&self, session_id: &str) -> Result<bool, StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = TOUCH_SESSION
        );
        async {
            let mut conn = self.connector.connect().await?;
            let now = Utc::now();
            let result = sqlx::query(TOUCH_SESSION)
                .bind(session_id)
                .bind(now)
                .bind(now + self.window)
                .execute(&mut conn)
                .await;
            release(conn).await;

            Ok(result.map_err(classify)?.rows_affected() > 0)
        }
        .instrument(span)
        .await
    }

    async fn revoke(&self, session_id: &str) -> Result<(), StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = REVOKE_SESSION
        );
        async {
            let mut conn = self.connector.connect().await?;
            let result = sqlx::query(REVOKE_SESSION)
                .bind(session_id)
                .bind(Utc::now())
                .execute(&mut conn)
                .await;
            release(conn).await;

            let affected = result.map_err(classify)?.rows_affected();
            if affected == 0 {
                debug!("Revoke matched no unrevoked session row");
            }
            Ok(())
        }
        .instrument(span)
        .await
    }
}
