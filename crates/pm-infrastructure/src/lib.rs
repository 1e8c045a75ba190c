//! # PM Infrastructure
//!
//! PostgreSQL adapters for the core repository ports.

pub mod database;

pub use database::{
    run_migrations, Candidate, CandidateConnector, PgSessionRepository, PgUserRepository,
};
