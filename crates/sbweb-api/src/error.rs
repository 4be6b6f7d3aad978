use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sbweb_session::SessionError;
use thiserror::Error;

use crate::response::{ApiResponse, ErrorBody};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request doesn't have a session cookie")]
    NoCookie,

    #[error("Session cookie is unknown or expired")]
    BadCookie,

    #[error("Request data is invalid: {0}")]
    InvalidRequest(String),

    #[error("Invalid email or password")]
    BadAuth,

    #[error("Failed to create session: {0}")]
    SessionCreate(String),

    #[error("Session backend unavailable: {0}")]
    ConnectionError(String),

    #[error("Service not ready: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoCookie | ApiError::BadCookie => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) | ApiError::BadAuth => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::SessionCreate(_) | ApiError::ConnectionError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoCookie => "NoCookieError",
            ApiError::BadCookie => "BadCookieError",
            ApiError::InvalidRequest(_) => "RequestDataValidError",
            ApiError::BadAuth => "BadAuth",
            ApiError::SessionCreate(_) => "SessionCreateError",
            ApiError::ConnectionError(_) => "ConnSMErr",
            ApiError::ServiceUnavailable(_) => "NotReady",
            ApiError::InternalError(_) => "InternalError",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            ApiError::NoCookie => "You have to be authenticated to access this address",
            ApiError::BadCookie => "You must have a valid cookie to access this address",
            ApiError::InvalidRequest(_) => "Check your request",
            ApiError::BadAuth => "Must enter an existing email/password pair",
            ApiError::ConnectionError(_) | ApiError::ServiceUnavailable(_) => {
                "Connect with your API provider"
            }
            ApiError::SessionCreate(_) | ApiError::InternalError(_) => "Try again later",
        }
    }

    /// Failure of `create_session` during login.
    pub fn from_create(err: SessionError) -> Self {
        match err {
            SessionError::BackendWrite(_) | SessionError::RandomSource(_) => {
                ApiError::SessionCreate(err.to_string())
            }
            other => other.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => ApiError::BadCookie,
            SessionError::Reconnect(_) | SessionError::Connect(_) => {
                ApiError::ConnectionError(err.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
            hint: self.hint(),
        };
        (status, Json(ApiResponse::failure(body))).into_response()
    }
}
