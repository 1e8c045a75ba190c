//! Application-wide constants

/// Sliding session window applied on creation and on every touch.
pub const DEFAULT_SESSION_WINDOW_MINUTES: i64 = 30;
/// Lifetime of access tokens minted at login.
pub const DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 30;
/// Lifetime used by the token codec when the caller passes no ttl.
pub const FALLBACK_TOKEN_TTL_MINUTES: i64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
/// Bound on one whole session store call, connect plus query.
pub const DEFAULT_STORE_OPERATION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const MIN_JWT_SECRET_BYTES: usize = 32;

pub const BEARER_SCHEME: &str = "bearer";
pub const TOKEN_TYPE_BEARER: &str = "bearer";
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Unix socket directory tried after a loopback primary endpoint.
pub const LOCAL_SOCKET_DIR: &str = "/var/run/postgresql";

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
