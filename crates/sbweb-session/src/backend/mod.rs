//! Key-value backend ports and adapters

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;

pub use self::memory::{MemoryConnection, MemoryConnector, MemoryServer};
pub use self::redis::{RedisConnection, RedisConnector};

/// One logical connection to a TTL-capable key-value store.
///
/// Methods take `&mut self`: a connection carries one command stream and must
/// not be driven by two callers at once.
#[async_trait]
pub trait KeyValueBackend: Send {
    /// `GET key`. A missing key is `Ok(None)`.
    async fn get(&mut self, key: &str) -> Result<Option<String>, BackendError>;

    /// `SET key value [EX ttl]`.
    async fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BackendError>;

    /// `DEL key`. Deleting a missing key is not an error.
    async fn del(&mut self, key: &str) -> Result<(), BackendError>;

    /// `PING`.
    async fn ping(&mut self) -> Result<(), BackendError>;
}

/// Dials new connections to a configured backend.
#[async_trait]
pub trait BackendConnector: Send + Sync + 'static {
    type Connection: KeyValueBackend + 'static;

    async fn connect(&self) -> Result<Self::Connection, BackendError>;

    /// Address for logs, without credentials.
    fn address(&self) -> String;
}

/// Whole seconds for `EX`; the store rejects `EX 0`.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
