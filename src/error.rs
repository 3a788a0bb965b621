/*
 * Responsibility
 * - Application-wide AppError
 * - IntoResponse implementation (HTTP status / fixed plain-text body)
 * - Convert authority / backend transport failures in one place
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::authority::AuthorityError;

pub const AUTH_UNAVAILABLE_MESSAGE: &str = "Unable to use jupyterhub to verify access to this \
     service. At this time, the docservice uses jupyterhub to control access to protected resources";

pub const INSUFFICIENT_SCOPE_MESSAGE: &str = "Access denied, token scopes are insufficient. \
     If you need access to this service, please contact CTA-CH DC team at EPFL.";

pub const MISSING_CODE_MESSAGE: &str = "Error: oauth callback code";

pub const INVALID_STATE_MESSAGE: &str = "Error: oauth callback invalid state";

#[derive(Debug, Error)]
pub enum AppError {
    // Identity broker not configured at all (not a per-request auth failure)
    #[error("authentication backend unavailable")]
    AuthUnavailable,
    #[error("insufficient scope")]
    InsufficientScope,
    #[error("oauth callback without code")]
    MissingCode,
    #[error("oauth callback state mismatch")]
    InvalidState,
    #[error(transparent)]
    Authority(#[from] AuthorityError),
    #[error("backend request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::AuthUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, AUTH_UNAVAILABLE_MESSAGE)
            }
            AppError::InsufficientScope => (StatusCode::FORBIDDEN, INSUFFICIENT_SCOPE_MESSAGE),
            AppError::MissingCode => (StatusCode::FORBIDDEN, MISSING_CODE_MESSAGE),
            AppError::InvalidState => (StatusCode::FORBIDDEN, INVALID_STATE_MESSAGE),
            AppError::Authority(_) => (StatusCode::BAD_GATEWAY, "identity broker request failed"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "backend request failed"),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, message).into_response()
    }
}
