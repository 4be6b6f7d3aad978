//! Session data model

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One authenticated principal's login.
///
/// Serialized as `{"ID": .., "Login": .., "UserAgent": ..}` so payloads written
/// by earlier deployments of the service stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Session {
    #[serde(rename = "ID")]
    pub user_id: i64,
    pub login: String,
    pub user_agent: String,
}

impl Session {
    pub fn new(user_id: i64, login: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            user_id,
            login: login.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Opaque session token handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn into_token(self) -> String {
        self.0
    }
}

impl From<String> for SessionId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifetime of a stored session, chosen by the caller at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicy {
    /// Removed by the backend once the duration elapses.
    Expiring(Duration),
    /// Kept until explicitly deleted (native app clients).
    Persistent,
}

impl TtlPolicy {
    /// Maps the legacy `expires` flag onto a policy.
    pub fn from_expires(expires: bool, ttl: Duration) -> Self {
        if expires {
            TtlPolicy::Expiring(ttl)
        } else {
            TtlPolicy::Persistent
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            TtlPolicy::Expiring(ttl) => Some(*ttl),
            TtlPolicy::Persistent => None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, TtlPolicy::Persistent)
    }
}
