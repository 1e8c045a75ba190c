//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use pm_shared::config::JwtSettings;
use pm_shared::constants::FALLBACK_TOKEN_TTL_MINUTES;
use pm_shared::Role;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Identity fields embedded in a token at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub user_id: i64,
    pub role: Role,
    pub session_id: String,
}

/// Full claim set as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User email.
    pub sub: String,
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: i64,
    pub role: Role,
    /// Session id the token is bound to.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

// Older tokens carried user_id as a string.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Mints and verifies HMAC-signed access tokens with a process-wide secret.
/// Rotating the secret invalidates every outstanding token.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, JwtError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| JwtError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(JwtError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
        })
    }

    pub fn from_settings(settings: &JwtSettings) -> Result<Self, JwtError> {
        Self::new(&settings.secret, &settings.algorithm)
    }

    /// Signs `identity` with `exp = now + ttl`. Without a ttl the token lives
    /// for `FALLBACK_TOKEN_TTL_MINUTES`.
    pub fn mint(&self, identity: &IdentityClaims, ttl: Option<Duration>) -> Result<String, JwtError> {
        let now = Utc::now();
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(FALLBACK_TOKEN_TTL_MINUTES));
        let claims = TokenClaims {
            sub: identity.subject.clone(),
            user_id: identity.user_id,
            role: identity.role,
            sid: identity.session_id.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    /// Verifies signature and expiry. Says nothing about whether the embedded
    /// session is still active.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken(e.to_string()),
            })?;

        if claims.sid.trim().is_empty() {
            return Err(JwtError::InvalidToken("missing session id".into()));
        }
        Ok(claims)
    }
}

pub fn mint_token(
    codec: &TokenCodec,
    identity: &IdentityClaims,
    ttl: Option<Duration>,
) -> Result<String, JwtError> {
    codec.mint(identity, ttl)
}

pub fn decode_token(codec: &TokenCodec, token: &str) -> Result<TokenClaims, JwtError> {
    codec.decode(token)
}
