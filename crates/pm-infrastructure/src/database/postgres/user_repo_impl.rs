// ============================================================================
// PM Infrastructure - PostgreSQL User Repository
// File: crates/pm-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};

use pm_core::domain::{NewUser, User};
use pm_core::error::DomainError;
use pm_core::repositories::UserRepository;
use pm_shared::Role;

use crate::database::connection::CandidateConnector;

pub struct PgUserRepository {
    connector: Arc<CandidateConnector>,
}

impl PgUserRepository {
    pub fn new(connector: Arc<CandidateConnector>) -> Self {
        Self { connector }
    }

    async fn connect(&self) -> Result<PgConnection, DomainError> {
        self.connector.connect().await.map_err(DomainError::from)
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    full_name: String,
    role: String,
    hashed_password: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).ok_or_else(|| {
            error!("User {} has unknown role '{}'", row.id, row.role);
            DomainError::DatabaseError(format!("unknown role: {}", row.role))
        })?;
        Ok(User {
            id: row.id,
            email: row.email,
            username: row.username,
            full_name: row.full_name,
            role,
            hashed_password: row.hashed_password,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

async fn release(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        debug!("Closing user store connection failed: {}", e);
    }
}

const SELECT_BY_EMAIL: &str = r#"
    SELECT id, email, username, full_name, role, hashed_password, is_active, created_at
    FROM users
    WHERE LOWER(email) = LOWER($1)
"#;

const SELECT_BY_USERNAME: &str = r#"
    SELECT id, email, username, full_name, role, hashed_password, is_active, created_at
    FROM users
    WHERE username = $1
"#;

const INSERT_USER: &str = r#"
    INSERT INTO users (email, username, full_name, role, hashed_password, is_active, created_at)
    VALUES ($1, $2, $3, $4, $5, TRUE, $6)
    RETURNING id, email, username, full_name, role, hashed_password, is_active, created_at
"#;

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = SELECT_BY_EMAIL
        );
        async {
            let mut conn = self.connect().await?;
            let result: Result<Option<UserRow>, sqlx::Error> = sqlx::query_as(SELECT_BY_EMAIL)
                .bind(email)
                .fetch_optional(&mut conn)
                .await;
            release(conn).await;

            let row = result.map_err(|e| {
                error!("Database error finding user by email: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
            row.map(User::try_from).transpose()
        }
        .instrument(span)
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = SELECT_BY_USERNAME
        );
        async {
            let mut conn = self.connect().await?;
            let result: Result<Option<UserRow>, sqlx::Error> = sqlx::query_as(SELECT_BY_USERNAME)
                .bind(username)
                .fetch_optional(&mut conn)
                .await;
            release(conn).await;

            let row = result.map_err(|e| {
                error!("Database error finding user by username: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
            row.map(User::try_from).transpose()
        }
        .instrument(span)
        .await
    }

    async fn create(&self, user: &NewUser) -> Result<User, DomainError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = INSERT_USER
        );
        async {
            let mut conn = self.connect().await?;
            let result: Result<UserRow, sqlx::Error> = sqlx::query_as(INSERT_USER)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.full_name)
                .bind(user.role.as_str())
                .bind(&user.hashed_password)
                .bind(Utc::now())
                .fetch_one(&mut conn)
                .await;
            release(conn).await;

            let row = result.map_err(|e| match &e {
                // Lost a race with a concurrent registration.
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    match db.constraint() {
                        Some("users_username_key") => {
                            DomainError::UsernameAlreadyExists(user.username.clone())
                        }
                        _ => DomainError::EmailAlreadyExists(user.email.clone()),
                    }
                }
                _ => {
                    error!("Database error creating user: {}", e);
                    DomainError::DatabaseError(e.to_string())
                }
            })?;
            User::try_from(row)
        }
        .instrument(span)
        .await
    }
}
