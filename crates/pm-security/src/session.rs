//! Session identifier generation

use rand::Rng;

const SESSION_ID_BYTES: usize = 32;

/// Returns a fresh 256-bit random session id, hex encoded.
pub fn generate_session_id() -> String {
    let bytes: [u8; SESSION_ID_BYTES] = rand::rng().random();
    hex::encode(bytes)
}
