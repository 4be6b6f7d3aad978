//! Application-wide constants

/// Namespace for session entries in a shared key-value backend.
pub const SESSION_KEY_PREFIX: &str = "sessions:";
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";
/// User agent sent by the native Android client. Its sessions never expire.
pub const NATIVE_APP_USER_AGENT: &str = "Android_app";
pub const DEFAULT_TOKEN_LENGTH: usize = 32;
pub const DEFAULT_EXPIRATION_SECS: u64 = 86_400;
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_SESSION_URL: &str = "redis://127.0.0.1:6379/0";
/// URL scheme selecting the in-process memory backend.
pub const MEMORY_BACKEND_SCHEME: &str = "memory://";
