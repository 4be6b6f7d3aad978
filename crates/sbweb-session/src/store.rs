//! Session persistence

use std::sync::Arc;

use sbweb_shared::constants::SESSION_KEY_PREFIX;
use tracing::{debug, error};

use crate::backend::BackendConnector;
use crate::error::{BackendError, SessionError};
use crate::model::{Session, SessionId, TtlPolicy};
use crate::supervisor::ConnectionSupervisor;
use crate::token::generate_token;

/// Maps sessions to tokens in the key-value backend.
pub struct SessionStore<C: BackendConnector> {
    supervisor: Arc<ConnectionSupervisor<C>>,
    token_length: usize,
}

impl<C: BackendConnector> SessionStore<C> {
    pub fn new(supervisor: Arc<ConnectionSupervisor<C>>, token_length: usize) -> Self {
        Self {
            supervisor,
            token_length,
        }
    }

    pub async fn create(&self, session: &Session, policy: TtlPolicy) -> Result<SessionId, SessionError> {
        let id = SessionId::new(generate_token(self.token_length)?);
        let payload = serde_json::to_string(session)
            .map_err(|e| SessionError::BackendWrite(BackendError::Payload(e.to_string())))?;

        self.supervisor
            .set(&storage_key(&id), &payload, policy.ttl())
            .await
            .map_err(|e| {
                error!("Failed to store session for user {}: {}", session.user_id, e);
                SessionError::BackendWrite(e)
            })?;

        debug!("Created session for user {} ({:?})", session.user_id, policy);
        Ok(id)
    }

    pub async fn check(&self, id: &SessionId) -> Result<Session, SessionError> {
        let payload = self
            .supervisor
            .get(&storage_key(id))
            .await
            .map_err(|e| {
                error!("Failed to read session: {}", e);
                SessionError::BackendRead(e)
            })?
            .ok_or_else(|| {
                debug!("Session not found or expired");
                SessionError::NotFound
            })?;

        decode(&payload)
    }

    /// Removes the session. Missing sessions are not an error.
    pub async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.supervisor.del(&storage_key(id)).await.map_err(|e| {
            error!("Failed to delete session: {}", e);
            SessionError::BackendWrite(e)
        })
    }
}

pub(crate) fn storage_key(id: &SessionId) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, id.token())
}

/// A stored `null` is the empty session.
fn decode(payload: &str) -> Result<Session, SessionError> {
    serde_json::from_str::<Option<Session>>(payload)
        .map(Option::unwrap_or_default)
        .map_err(|e| {
            error!("Stored session payload is malformed: {}", e);
            SessionError::BackendRead(BackendError::Payload(e.to_string()))
        })
}
