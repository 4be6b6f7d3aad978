use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use sbweb_session::{Session, SessionId};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Session of the authenticated caller, placed in request extensions by
/// [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: SessionId,
    pub session: Session,
}

/// Makes sure the session backend answers before a stateful handler runs,
/// reconnecting once if the probe fails.
pub async fn require_backend(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.sessions.is_connected().await {
        warn!("Session backend is not reachable, trying to reconnect");
        state.sessions.try_reconnect().await?;
    }

    Ok(next.run(request).await)
}

/// Rejects requests without a live session cookie.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(&state.cookie.name)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::NoCookie)?;

    let id = SessionId::new(token);
    let session = state.sessions.check_session(&id).await?;
    debug!("Request authenticated as user {}", session.user_id);

    request
        .extensions_mut()
        .insert(CurrentSession { id, session });
    Ok(next.run(request).await)
}
