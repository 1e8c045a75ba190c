//! Connect-per-operation access to the session database over an ordered list
//! of candidate endpoints.

use anyhow::Context;
use pm_core::StoreError;
use pm_shared::config::DatabaseSettings;
use pm_shared::constants::LOCAL_SOCKET_DIR;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One connection target plus a password-free label for logs.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub options: PgConnectOptions,
}

impl Candidate {
    pub fn new(options: PgConnectOptions) -> Self {
        Self {
            label: describe(&options),
            options,
        }
    }
}

/// Tries candidates strictly in order, one attempt each, every attempt bounded
/// by `connect_timeout`. No fan-out.
#[derive(Debug, Clone)]
pub struct CandidateConnector {
    candidates: Vec<Candidate>,
    connect_timeout: Duration,
}

impl CandidateConnector {
    /// Drops later duplicates (same label), keeping first-seen order.
    pub fn new(candidates: Vec<Candidate>, connect_timeout: Duration) -> Self {
        let mut unique: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.iter().any(|c| c.label == candidate.label) {
                unique.push(candidate);
            }
        }
        Self {
            candidates: unique,
            connect_timeout,
        }
    }

    /// Primary url, then `fallback_urls`, then the local Unix socket when the
    /// primary points at loopback and `local_socket_fallback` is on.
    pub fn from_settings(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let primary = PgConnectOptions::from_str(&settings.url)
            .context("invalid database.url")?;

        let mut candidates = vec![Candidate::new(primary.clone())];
        for url in &settings.fallback_urls {
            let options = PgConnectOptions::from_str(url)
                .with_context(|| format!("invalid database.fallback_urls entry: {}", redact(url)))?;
            candidates.push(Candidate::new(options));
        }
        if settings.local_socket_fallback && cfg!(unix) && is_loopback(primary.get_host()) {
            candidates.push(Candidate::new(primary.socket(LOCAL_SOCKET_DIR)));
        }

        Ok(Self::new(candidates, settings.connect_timeout()))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.label.as_str()).collect()
    }

    /// Opens a fresh connection through the first candidate that answers.
    pub async fn connect(&self) -> Result<PgConnection, StoreError> {
        let mut last_error: Option<String> = None;

        for candidate in &self.candidates {
            debug!("Connecting to session database using: {}", candidate.label);
            match tokio::time::timeout(
                self.connect_timeout,
                PgConnection::connect_with(&candidate.options),
            )
            .await
            {
                Ok(Ok(conn)) => return Ok(conn),
                Ok(Err(e)) => {
                    info!(
                        "Connection attempt failed for '{}'; trying next. Details: {}",
                        candidate.label, e
                    );
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    info!(
                        "Connection attempt to '{}' timed out after {:?}; trying next",
                        candidate.label, self.connect_timeout
                    );
                    last_error = Some(format!("timed out after {:?}", self.connect_timeout));
                }
            }
        }

        warn!(
            "All {} database candidates failed: {}",
            self.candidates.len(),
            last_error.as_deref().unwrap_or("none configured")
        );
        Err(StoreError::Unavailable(
            last_error.unwrap_or_else(|| "no candidate endpoints configured".to_string()),
        ))
    }
}

fn describe(options: &PgConnectOptions) -> String {
    let database = options.get_database().unwrap_or("postgres");
    match options.get_socket() {
        Some(dir) => format!("unix:{}/{}", dir.display(), database),
        None => format!("{}:{}/{}", options.get_host(), options.get_port(), database),
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
}

// Strips userinfo from a url before it goes into an error message.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
