//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_JWT_ALGORITHM,
    DEFAULT_SESSION_WINDOW_MINUTES, DEFAULT_STORE_OPERATION_TIMEOUT_SECS, MIN_JWT_SECRET_BYTES,
};
use crate::error::AppError;
use crate::utils::parse_flag;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub jwt: JwtSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Primary endpoint, always tried first.
    pub url: String,
    /// Extra endpoints tried in order after the primary.
    #[serde(default)]
    pub fallback_urls: Vec<String>,
    pub local_socket_fallback: bool,
    pub connect_timeout_secs: u64,
    /// Cap on one session store call, connect and query together.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
    pub run_migrations: bool,
}

fn default_operation_timeout_secs() -> u64 {
    DEFAULT_STORE_OPERATION_TIMEOUT_SECS
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.operation_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub window_minutes: i64,
    /// Skip both session stores and trust token signature/expiry alone.
    /// Development only.
    pub bypass_db_session: bool,
}

impl SessionSettings {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }
}

#[derive(Clone, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: String,
    pub access_token_expiry_minutes: i64,
}

impl JwtSettings {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expiry_minutes)
    }
}

// Manual impl so the secret never ends up in a log line.
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expiry_minutes", &self.access_token_expiry_minutes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
    #[serde(default)]
    pub directory: Option<String>,
}

impl AppConfig {
    /// Builder pre-populated with every default except the signing secret.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8000)?
            .set_default("app.name", "pm-server")?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "postgres://localhost/property_manager_db")?
            .set_default("database.fallback_urls", Vec::<String>::new())?
            .set_default("database.local_socket_fallback", true)?
            .set_default("database.connect_timeout_secs", DEFAULT_CONNECT_TIMEOUT_SECS)?
            .set_default(
                "database.operation_timeout_secs",
                DEFAULT_STORE_OPERATION_TIMEOUT_SECS,
            )?
            .set_default("database.run_migrations", true)?
            .set_default("session.window_minutes", DEFAULT_SESSION_WINDOW_MINUTES)?
            .set_default("session.bypass_db_session", false)?
            .set_default("jwt.algorithm", DEFAULT_JWT_ALGORITHM)?
            .set_default(
                "jwt.access_token_expiry_minutes",
                DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES,
            )?
            .set_default("log.level", "info")
    }

    pub fn load() -> Result<Self, AppError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let legacy_bypass = std::env::var("BYPASS_DB_SESSION")
            .ok()
            .map(|v| parse_flag(&v));

        let config: AppConfig = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("database.fallback_urls")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            )
            .set_override_option("session.bypass_db_session", legacy_bypass)?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(AppError::InvalidConfig(format!(
                "jwt.secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if !matches!(self.jwt.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            return Err(AppError::InvalidConfig(format!(
                "jwt.algorithm must be an HMAC algorithm, got {}",
                self.jwt.algorithm
            )));
        }
        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::InvalidConfig(
                "jwt.access_token_expiry_minutes must be positive".into(),
            ));
        }
        if self.session.window_minutes <= 0 {
            return Err(AppError::InvalidConfig(
                "session.window_minutes must be positive".into(),
            ));
        }
        if self.database.connect_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "database.connect_timeout_secs must be positive".into(),
            ));
        }
        if self.database.operation_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "database.operation_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn build(overrides: &[(&str, &str)]) -> AppConfig {
        let mut builder = AppConfig::defaults().unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap().try_deserialize().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = build(&[("jwt.secret", SECRET)]);
        assert_eq!(config.session.window_minutes, 30);
        assert!(!config.session.bypass_db_session);
        assert_eq!(config.jwt.algorithm, "HS256");
        assert_eq!(config.jwt.access_token_ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.database.connect_timeout(), StdDuration::from_secs(3));
        assert_eq!(config.database.operation_timeout(), StdDuration::from_secs(5));
        assert!(config.database.fallback_urls.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_to_deserialize() {
        let result = AppConfig::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = build(&[("jwt.secret", "short")]);
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_asymmetric_algorithm() {
        let config = build(&[("jwt.secret", SECRET), ("jwt.algorithm", "RS256")]);
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = build(&[("jwt.secret", SECRET), ("session.window_minutes", "0")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_operation_timeout() {
        let config = build(&[
            ("jwt.secret", SECRET),
            ("database.operation_timeout_secs", "0"),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = build(&[("jwt.secret", SECRET)]);
        let rendered = format!("{:?}", config.jwt);
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
