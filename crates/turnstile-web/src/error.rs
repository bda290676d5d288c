use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use turnstile_core::{LoginError, Rejection};

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Auth(String),
    Forbidden(String),
    NotFound(String),
    Throttled { retry_after: Duration },
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Throttled { retry_after: wait } => {
                retry_after = Some(retry_after_secs(wait));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests".to_string(),
                )
            }
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match &e {
            LoginError::InvalidInput => {
                AppError::BadRequest("Username and password are required.".to_string())
            }
            LoginError::Unauthorized => {
                AppError::Auth("Invalid username or password".to_string())
            }
            LoginError::StoreUnavailable(_) | LoginError::Signing(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Throttled(throttle) => AppError::Throttled {
                retry_after: throttle.retry_after,
            },
            Rejection::Unauthenticated(failure) => {
                tracing::warn!("Authentication failed: {failure}");
                AppError::Auth("Invalid or missing token".to_string())
            }
            Rejection::Forbidden(claim) => {
                tracing::warn!("Token has unusable '{claim}' claim");
                AppError::Forbidden("Invalid token claims".to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}
