use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

pub async fn login_info() -> Json<LoginInfoResponse> {
    Json(LoginInfoResponse {
        message: "Use the POST method to authenticate".to_string(),
        example: LoginExample {
            username: "your-username".to_string(),
            password: "your-password".to_string(),
        },
    })
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state.authenticator.login(&request).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: outcome.token,
        name: outcome.name,
        code: outcome.code,
        expires_at: outcome.expires_at,
    }))
}
