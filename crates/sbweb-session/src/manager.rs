//! Session manager façade

use std::sync::Arc;

use async_trait::async_trait;
use sbweb_shared::constants::MEMORY_BACKEND_SCHEME;
use sbweb_shared::SessionSettings;
use tracing::warn;

use crate::backend::{BackendConnector, MemoryServer, RedisConnector};
use crate::error::SessionError;
use crate::model::{Session, SessionId, TtlPolicy};
use crate::store::SessionStore;
use crate::supervisor::{ConnectionState, ConnectionSupervisor};

/// Everything the HTTP layer needs from the session subsystem.
///
/// `is_connected` reports a failed probe as `false`; every other operation
/// returns a typed error.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn create_session(&self, session: &Session, policy: TtlPolicy) -> Result<SessionId, SessionError>;

    async fn check_session(&self, id: &SessionId) -> Result<Session, SessionError>;

    async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError>;

    async fn is_connected(&self) -> bool;

    async fn try_reconnect(&self) -> Result<(), SessionError>;

    /// Policy for clients whose sessions expire, using the configured TTL.
    fn expiring_policy(&self) -> TtlPolicy;
}

pub struct SessionManager<C: BackendConnector> {
    store: SessionStore<C>,
    supervisor: Arc<ConnectionSupervisor<C>>,
    expiring: TtlPolicy,
}

impl<C: BackendConnector> SessionManager<C> {
    /// Validates settings and dials the initial backend connection.
    pub async fn connect(connector: C, settings: &SessionSettings) -> Result<Self, SessionError> {
        validate(settings)?;

        let supervisor = Arc::new(ConnectionSupervisor::connect(connector, settings.op_timeout()).await?);
        Ok(Self {
            store: SessionStore::new(supervisor.clone(), settings.token_length),
            supervisor,
            expiring: TtlPolicy::Expiring(settings.expiration()),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }
}

#[async_trait]
impl<C: BackendConnector> SessionProvider for SessionManager<C> {
    async fn create_session(&self, session: &Session, policy: TtlPolicy) -> Result<SessionId, SessionError> {
        self.store.create(session, policy).await
    }

    async fn check_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.store.check(id).await
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        self.store.delete(id).await
    }

    async fn is_connected(&self) -> bool {
        self.supervisor.is_connected().await
    }

    async fn try_reconnect(&self) -> Result<(), SessionError> {
        self.supervisor.try_reconnect().await
    }

    fn expiring_policy(&self) -> TtlPolicy {
        self.expiring
    }
}

/// Builds a manager for the backend named by `settings.url`.
///
/// `memory://` starts a private in-process server; anything else is a Redis URL.
pub async fn connect_from_settings(
    settings: &SessionSettings,
) -> Result<Arc<dyn SessionProvider>, SessionError> {
    if settings.url.starts_with(MEMORY_BACKEND_SCHEME) {
        warn!("Using in-process session backend, sessions will not survive a restart");
        let server = MemoryServer::new();
        let manager = SessionManager::connect(server.connector(), settings).await?;
        return Ok(Arc::new(manager));
    }

    let connector =
        RedisConnector::new(&settings.url).map_err(|e| SessionError::Config(e.to_string()))?;
    let manager = SessionManager::connect(connector, settings).await?;
    Ok(Arc::new(manager))
}

fn validate(settings: &SessionSettings) -> Result<(), SessionError> {
    if settings.token_length == 0 {
        return Err(SessionError::Config("token_length must be positive".into()));
    }
    if settings.expiration_secs == 0 {
        return Err(SessionError::Config("expiration_secs must be positive".into()));
    }
    if settings.op_timeout_ms == 0 {
        return Err(SessionError::Config("op_timeout_ms must be positive".into()));
    }
    if settings.token_length < 16 {
        warn!(
            "Session tokens of {} bytes are short, 16 or more is recommended",
            settings.token_length
        );
    }
    Ok(())
}
