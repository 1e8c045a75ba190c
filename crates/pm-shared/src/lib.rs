//! # PM Shared
//!
//! Shared configuration, telemetry, constants and types for the property
//! manager backend.

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use error::AppError;
pub use types::*;
