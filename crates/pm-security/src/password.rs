//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use pm_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use thiserror::Error;
use tracing::warn;

// Fixed work factor: 19 MiB, 2 passes, 1 lane.
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_LANES: u32 = 1;

/// Lowest acceptable zxcvbn score (0..=4).
const MIN_PASSWORD_SCORE: u8 = 2;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Password too short")]
    TooShort,
    #[error("Password too long")]
    TooLong,
    #[error("Password too weak")]
    TooWeak,
}

pub struct PasswordService;

impl PasswordService {
    /// Salted Argon2id hash in PHC string form. Two calls with the same input
    /// never return the same string.
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, None)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    /// Checks `password` against a stored hash. A malformed or unsupported
    /// stored hash verifies `false`; it never errors.
    pub fn verify(password: &str, hash: &str) -> bool {
        if is_bcrypt(hash) {
            return match bcrypt::verify(password, hash) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!("Stored bcrypt hash could not be verified: {}", e);
                    false
                }
            };
        }

        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        // Params come from the PHC string, so older work factors still verify.
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Length bounds plus a zxcvbn score floor. `user_inputs` are words the
    /// password should not be built from (email, username...).
    pub fn check_strength(password: &str, user_inputs: &[&str]) -> Result<(), PasswordError> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }
        let entropy = zxcvbn::zxcvbn(password, user_inputs);
        if u8::from(entropy.score()) < MIN_PASSWORD_SCORE {
            return Err(PasswordError::TooWeak);
        }
        Ok(())
    }
}

fn is_bcrypt(hash: &str) -> bool {
    hash.starts_with("$2a$") || hash.starts_with("$2b$") || hash.starts_with("$2y$")
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    PasswordService::hash(password)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordService::verify(password, hash)
}
