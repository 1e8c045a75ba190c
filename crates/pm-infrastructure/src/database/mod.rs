//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod postgres;

pub use connection::{Candidate, CandidateConnector};
pub use postgres::{PgSessionRepository, PgUserRepository};

use sqlx::migrate::Migrator;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies pending migrations through the first reachable candidate.
pub async fn run_migrations(connector: &CandidateConnector) -> anyhow::Result<()> {
    let mut conn = connector.connect().await?;
    MIGRATOR.run(&mut conn).await?;
    info!("Database migrations applied");
    Ok(())
}
