//! Backend connection supervision
//!
//! The supervisor owns the one connection handle the session manager uses.
//! Every command holds the handle lock for a single round trip, so no two
//! callers ever interleave frames on the same connection, and a reconnect
//! swaps the handle only once in-flight commands have released it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::{BackendConnector, KeyValueBackend};
use crate::error::{BackendError, SessionError};

/// Last observed reachability of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

pub struct ConnectionSupervisor<C: BackendConnector> {
    connector: C,
    handle: Mutex<C::Connection>,
    connected: AtomicBool,
    op_timeout: Duration,
}

impl<C: BackendConnector> ConnectionSupervisor<C> {
    /// Dials the initial connection.
    pub async fn connect(connector: C, op_timeout: Duration) -> Result<Self, SessionError> {
        let conn = dial(&connector, op_timeout)
            .await
            .map_err(SessionError::Connect)?;
        info!("Connected to session backend at {}", connector.address());

        Ok(Self {
            connector,
            handle: Mutex::new(conn),
            connected: AtomicBool::new(true),
            op_timeout,
        })
    }

    pub fn state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// PINGs the backend. Failure is reported as `false`, never as an error:
    /// an unreachable backend is a routine condition for callers that poll.
    pub async fn is_connected(&self) -> bool {
        let mut conn = self.handle.lock().await;
        match self.observe(conn.ping()).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Session backend ping failed: {}", e);
                false
            }
        }
    }

    /// Replaces the connection handle with a freshly dialed one.
    ///
    /// The dial happens without holding the handle, so callers are not stalled
    /// while it runs. On failure the previous handle stays in place.
    pub async fn try_reconnect(&self) -> Result<(), SessionError> {
        let address = self.connector.address();
        match dial(&self.connector, self.op_timeout).await {
            Ok(fresh) => {
                let mut conn = self.handle.lock().await;
                *conn = fresh;
                self.connected.store(true, Ordering::SeqCst);
                info!("Reconnected to session backend at {}", address);
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                warn!("Reconnect to session backend at {} failed: {}", address, e);
                Err(SessionError::Reconnect(e))
            }
        }
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.handle.lock().await;
        self.observe(conn.get(key)).await
    }

    pub(crate) async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let mut conn = self.handle.lock().await;
        self.observe(conn.set(key, value, ttl)).await
    }

    pub(crate) async fn del(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.handle.lock().await;
        self.observe(conn.del(key)).await
    }

    /// Bounds one round trip by the operation timeout and records the outcome.
    /// Only connection faults mark the backend as disconnected; a command the
    /// server rejects still proves the connection works.
    async fn observe<T, F>(&self, op: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let result = match timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.op_timeout)),
        };
        match &result {
            Ok(_) => self.connected.store(true, Ordering::SeqCst),
            Err(e) if e.is_connection_fault() => self.connected.store(false, Ordering::SeqCst),
            Err(_) => {}
        }
        result
    }
}

async fn dial<C: BackendConnector>(
    connector: &C,
    op_timeout: Duration,
) -> Result<C::Connection, BackendError> {
    match timeout(op_timeout, connector.connect()).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(op_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::backend::MemoryServer;

    const OP_TIMEOUT: Duration = Duration::from_secs(1);

    #[derive(Clone, Copy)]
    enum Fault {
        /// Accepts the connection, then never answers.
        Stall,
        /// Answers PING but rejects every data command.
        Reject,
    }

    struct FaultyConnector(Fault);

    struct FaultyConnection(Fault);

    impl FaultyConnection {
        async fn reply<T>(&self) -> Result<T, BackendError> {
            match self.0 {
                Fault::Stall => std::future::pending().await,
                Fault::Reject => Err(BackendError::Payload(
                    "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
                )),
            }
        }
    }

    #[async_trait]
    impl BackendConnector for FaultyConnector {
        type Connection = FaultyConnection;

        async fn connect(&self) -> Result<FaultyConnection, BackendError> {
            Ok(FaultyConnection(self.0))
        }

        fn address(&self) -> String {
            "faulty://".to_string()
        }
    }

    #[async_trait]
    impl KeyValueBackend for FaultyConnection {
        async fn get(&mut self, _key: &str) -> Result<Option<String>, BackendError> {
            self.reply().await
        }

        async fn set(&mut self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), BackendError> {
            self.reply().await
        }

        async fn del(&mut self, _key: &str) -> Result<(), BackendError> {
            self.reply().await
        }

        async fn ping(&mut self) -> Result<(), BackendError> {
            match self.0 {
                Fault::Stall => std::future::pending().await,
                Fault::Reject => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let op_timeout = Duration::from_millis(50);
        let supervisor = ConnectionSupervisor::connect(FaultyConnector(Fault::Stall), op_timeout)
            .await
            .unwrap();
        assert_eq!(supervisor.state(), ConnectionState::Connected);

        let err = supervisor.get("sessions:x").await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(d) if d == op_timeout));
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);

        assert!(!supervisor.is_connected().await);
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_rejected_command_keeps_connected_state() {
        let supervisor = ConnectionSupervisor::connect(FaultyConnector(Fault::Reject), OP_TIMEOUT)
            .await
            .unwrap();

        assert!(matches!(
            supervisor.set("sessions:x", "{}", None).await,
            Err(BackendError::Payload(_))
        ));
        assert_eq!(supervisor.state(), ConnectionState::Connected);
        assert!(supervisor.is_connected().await);
    }

    #[tokio::test]
    async fn test_initial_connect_fails_when_server_down() {
        let server = MemoryServer::new();
        server.close();

        let result = ConnectionSupervisor::connect(server.connector(), OP_TIMEOUT).await;
        assert!(matches!(result, Err(SessionError::Connect(_))));
    }

    #[tokio::test]
    async fn test_state_follows_observed_failures() {
        let server = MemoryServer::new();
        let supervisor = ConnectionSupervisor::connect(server.connector(), OP_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(supervisor.state(), ConnectionState::Connected);

        server.close();
        assert!(supervisor.get("sessions:x").await.is_err());
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);

        server.restart();
        // Old handle was reset by the restart
        assert!(!supervisor.is_connected().await);
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);

        supervisor.try_reconnect().await.unwrap();
        assert_eq!(supervisor.state(), ConnectionState::Connected);
        assert!(supervisor.is_connected().await);
    }

    #[tokio::test]
    async fn test_failed_reconnect_surfaces_error() {
        let server = MemoryServer::new();
        let supervisor = ConnectionSupervisor::connect(server.connector(), OP_TIMEOUT)
            .await
            .unwrap();

        server.close();
        let err = supervisor.try_reconnect().await.unwrap_err();
        assert!(matches!(err, SessionError::Reconnect(BackendError::Unreachable(_))));

        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert!(matches!(
            supervisor.del("sessions:x").await,
            Err(BackendError::Unreachable(_))
        ));
    }
}
