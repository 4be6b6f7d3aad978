//! In-process key-value server
//!
//! Behaves like a small Redis for development and tests: TTLs are enforced
//! lazily on read against a clock that tests can fast-forward, and the server
//! can be stopped and restarted. A restart invalidates every connection opened
//! before it, the way a real server restart resets client sockets.
//!
//! Keys that expire without being read again are dropped by a sweep that
//! writes trigger at most once per [`SWEEP_INTERVAL_MS`] of server time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ttl_seconds, BackendConnector, KeyValueBackend};
use crate::error::BackendError;

/// Minimum server time between two expiry sweeps.
const SWEEP_INTERVAL_MS: u64 = 1_000;

struct Entry {
    value: String,
    expires_at_ms: Option<u64>,
}

impl Entry {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|at| now_ms >= at)
    }
}

struct Inner {
    map: DashMap<String, Entry>,
    running: AtomicBool,
    generation: AtomicU64,
    skew_ms: AtomicU64,
    last_sweep_ms: AtomicU64,
    started: Instant,
}

/// Handle to a shared in-process store. Clones refer to the same server.
#[derive(Clone)]
pub struct MemoryServer {
    inner: Arc<Inner>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                map: DashMap::new(),
                running: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                skew_ms: AtomicU64::new(0),
                last_sweep_ms: AtomicU64::new(0),
                started: Instant::now(),
            }),
        }
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
        }
    }

    /// Stops accepting commands and connections. Stored data is kept.
    pub fn close(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Starts accepting again. Connections from before the restart stay dead.
    pub fn restart(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Advances the server clock used for TTL checks.
    pub fn fast_forward(&self, by: Duration) {
        self.inner
            .skew_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = self.now_ms();
        self.inner.map.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored keys, counting expired ones not yet swept.
    pub fn stored_len(&self) -> usize {
        self.inner.map.len()
    }

    /// Drops every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.now_ms();
        let before = self.inner.map.len();
        self.inner.map.retain(|_, entry| !entry.is_expired(now));
        self.inner.last_sweep_ms.store(now, Ordering::SeqCst);
        before.saturating_sub(self.inner.map.len())
    }

    /// Runs [`purge_expired`](Self::purge_expired) if the last sweep is old enough.
    fn maybe_sweep(&self, now: u64) {
        let last = self.inner.last_sweep_ms.load(Ordering::SeqCst);
        if now.saturating_sub(last) < SWEEP_INTERVAL_MS {
            return;
        }
        // One writer wins the sweep, the others carry on
        if self
            .inner
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.map.retain(|_, entry| !entry.is_expired(now));
        }
    }

    /// Writes a raw value, bypassing any connection.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms: None,
            },
        );
    }

    fn now_ms(&self) -> u64 {
        self.inner.started.elapsed().as_millis() as u64 + self.inner.skew_ms.load(Ordering::SeqCst)
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
}

#[async_trait]
impl BackendConnector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, BackendError> {
        if !self.server.is_running() {
            return Err(BackendError::Unreachable("connection refused".to_string()));
        }
        Ok(MemoryConnection {
            server: self.server.clone(),
            generation: self.server.generation(),
        })
    }

    fn address(&self) -> String {
        sbweb_shared::constants::MEMORY_BACKEND_SCHEME.to_string()
    }
}

pub struct MemoryConnection {
    server: MemoryServer,
    generation: u64,
}

impl MemoryConnection {
    fn alive(&self) -> Result<&MemoryServer, BackendError> {
        if !self.server.is_running() {
            return Err(BackendError::Unreachable("server closed".to_string()));
        }
        if self.generation != self.server.generation() {
            return Err(BackendError::Unreachable("connection reset".to_string()));
        }
        Ok(&self.server)
    }
}

#[async_trait]
impl KeyValueBackend for MemoryConnection {
    async fn get(&mut self, key: &str) -> Result<Option<String>, BackendError> {
        let server = self.alive()?;
        let now = server.now_ms();
        let map = &server.inner.map;

        if let Some(entry) = map.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        // A concurrent SET may have replaced the expired value meanwhile
        map.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BackendError> {
        let server = self.alive()?;
        let now = server.now_ms();
        server.maybe_sweep(now);
        let expires_at_ms = ttl.map(|ttl| now + ttl_seconds(ttl) * 1000);
        server.inner.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn del(&mut self, key: &str) -> Result<(), BackendError> {
        let server = self.alive()?;
        server.inner.map.remove(key);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), BackendError> {
        self.alive().map(|_| ())
    }
}
