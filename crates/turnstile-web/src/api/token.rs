use axum::Json;

use crate::auth::middleware::AuthUser;
use crate::dto::ClaimsResponse;

/// Echoes the claims of a valid token.
pub async fn validate_token(user: AuthUser) -> Json<ClaimsResponse> {
    tracing::info!("Token validated for user: {}", user.name);
    Json(ClaimsResponse {
        name: user.name,
        code: user.code,
    })
}
