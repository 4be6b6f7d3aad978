//! # SBWeb API
//!
//! Session-facing HTTP layer: cookie and backend-connectivity middleware,
//! login/logout handlers and health probes.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth as auth_handlers, health};
use crate::middleware::session::{require_backend, require_session};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // Needs a reachable session backend
    let session_routes = Router::new()
        .route("/users/login", post(auth_handlers::login))
        .route(
            "/users/logout",
            post(auth_handlers::logout).delete(auth_handlers::logout),
        )
        .route_layer(from_fn_with_state(state.clone(), require_backend));

    // Needs a reachable backend and a valid session cookie
    let protected_routes = Router::new()
        .route("/users/session", get(auth_handlers::current_session))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state.clone(), require_backend));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .merge(session_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
