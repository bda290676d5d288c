use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Claims of the caller, placed in request extensions by the gate
/// middleware once the token is verified and authorized.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub name: String,
    pub code: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent only if the route was not declared protected.
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            tracing::warn!("Handler requires authentication but route is not protected");
            AppError::Auth("Invalid or missing token".to_string())
        })
    }
}
