//! Login, logout and current-session handlers

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Extension, Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use sbweb_session::{Session, SessionId, TtlPolicy};
use sbweb_shared::{constants::NATIVE_APP_USER_AGENT, CookieSettings};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::CurrentSession;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub login: String,
    pub persistent: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionDto {
    pub user_id: i64,
    pub login: String,
    pub user_agent: String,
}

/// Login handler - POST /users/login
///
/// Native app clients get a session that never expires; everyone else gets
/// the configured TTL, mirrored in the cookie's `Max-Age`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(payload): Form<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let principal = state
        .authenticator
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or(ApiError::BadAuth)?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let policy = if user_agent == NATIVE_APP_USER_AGENT {
        TtlPolicy::Persistent
    } else {
        state.sessions.expiring_policy()
    };

    let session = Session::new(principal.user_id, principal.login.clone(), user_agent);
    let id = state
        .sessions
        .create_session(&session, policy)
        .await
        .map_err(ApiError::from_create)?;
    info!("User {} logged in", principal.user_id);

    let jar = jar.add(session_cookie(&state.cookie, &id, policy));
    Ok((
        jar,
        Json(ApiResponse::ok(LoginResponse {
            id: principal.user_id,
            login: principal.login,
            persistent: policy.is_persistent(),
        })),
    ))
}

/// Logout handler - POST|DELETE /users/logout
///
/// Always succeeds; a session the backend failed to drop is only logged.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let Some(token) = jar.get(&state.cookie.name).map(|c| c.value().to_string()) else {
        return (jar, Json(ApiResponse::ok(())));
    };

    if let Err(e) = state.sessions.delete_session(&SessionId::new(token)).await {
        warn!("Failed to delete session on logout: {}", e);
    }

    let expired = Cookie::build((state.cookie.name.clone(), "")).path("/").build();
    (jar.remove(expired), Json(ApiResponse::ok(())))
}

/// Current session handler - GET /users/session
pub async fn current_session(
    Extension(current): Extension<CurrentSession>,
) -> Json<ApiResponse<SessionDto>> {
    let session = current.session;
    Json(ApiResponse::ok(SessionDto {
        user_id: session.user_id,
        login: session.login,
        user_agent: session.user_agent,
    }))
}

fn session_cookie(settings: &CookieSettings, id: &SessionId, policy: TtlPolicy) -> Cookie<'static> {
    let mut cookie = Cookie::build((settings.name.clone(), id.token().to_string()))
        .path("/")
        .http_only(true)
        .secure(settings.secure);
    if let Some(ttl) = policy.ttl() {
        cookie = cookie.max_age(time::Duration::seconds(ttl.as_secs() as i64));
    }
    cookie.build()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use sbweb_session::MemoryServer;
    use tower::ServiceExt;

    use super::*;
    use crate::router;
    use crate::test_support::{state_with, LOGIN, PASSWORD, TTL_SECS, USER_ID};

    fn login_request(email: &str, password: &str, user_agent: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/users/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::USER_AGENT, user_agent)
            .body(Body::from(format!(
                "email={}&password={}",
                email.replace('@', "%40"),
                password.replace(' ', "+")
            )))
            .unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("Set-Cookie header")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// `name=value` part of a Set-Cookie header, usable as a Cookie header.
    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().trim().to_string()
    }

    fn whoami(cookie: &str) -> Request<Body> {
        Request::builder()
            .uri("/users/session")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_browser_login_sets_expiring_cookie() {
        let server = MemoryServer::new();
        let state = state_with(&server).await;

        let response = router(state.clone())
            .oneshot(login_request(LOGIN, PASSWORD, "Mozilla/5.0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = set_cookie(&response);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains(&format!("Max-Age={}", TTL_SECS)));

        let body = json_body(response).await;
        assert_eq!(body["data"]["persistent"], false);

        let current = router(state).oneshot(whoami(&cookie_pair(&cookie))).await.unwrap();
        assert_eq!(current.status(), StatusCode::OK);
        let body = json_body(current).await;
        assert_eq!(body["data"]["user_id"], USER_ID);
        assert_eq!(body["data"]["user_agent"], "Mozilla/5.0");
    }

    #[tokio::test]
    async fn test_native_app_login_is_persistent() {
        let server = MemoryServer::new();
        let state = state_with(&server).await;

        let response = router(state.clone())
            .oneshot(login_request(LOGIN, PASSWORD, NATIVE_APP_USER_AGENT))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = set_cookie(&response);
        assert!(!cookie.contains("Max-Age"));

        // Far past the expiring TTL
        server.fast_forward(std::time::Duration::from_secs(TTL_SECS * 10));
        let current = router(state).oneshot(whoami(&cookie_pair(&cookie))).await.unwrap();
        assert_eq!(current.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], USER_ID);
        assert_eq!(body["data"]["persistent"], true);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let server = MemoryServer::new();
        let app = router(state_with(&server).await);

        let wrong_password = app
            .clone()
            .oneshot(login_request(LOGIN, "wrong", "Mozilla/5.0"))
            .await
            .unwrap();
        assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(wrong_password).await["error"]["code"], "BadAuth");

        let not_an_email = app
            .oneshot(login_request("nobody", PASSWORD, "Mozilla/5.0"))
            .await
            .unwrap();
        assert_eq!(not_an_email.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(not_an_email).await["error"]["code"], "RequestDataValidError");
        assert!(server.is_empty());
    }

    #[tokio::test]
    async fn test_logout_deletes_session() {
        let server = MemoryServer::new();
        let state = state_with(&server).await;
        let id = state
            .sessions
            .create_session(&Session::new(USER_ID, LOGIN, "Mozilla/5.0"), TtlPolicy::Persistent)
            .await
            .unwrap();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/users/logout")
                    .header(header::COOKIE, format!("session_id={}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).contains("session_id="));
        assert!(state.sessions.check_session(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_logout_without_cookie_is_ok() {
        let server = MemoryServer::new();
        let response = router(state_with(&server).await)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_current_session_after_login() {
        let server = MemoryServer::new();
        let app = router(state_with(&server).await);

        let login = app
            .clone()
            .oneshot(login_request(LOGIN, PASSWORD, "Mozilla/5.0"))
            .await
            .unwrap();
        let cookie = cookie_pair(&set_cookie(&login));

        let response = app.oneshot(whoami(&cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["user_id"], USER_ID);
        assert_eq!(body["data"]["login"], LOGIN);
    }
}
