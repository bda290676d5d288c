mod login;
mod terminal;
mod token;

use axum::routing::{get, post};
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Routes under `/api`. Which of them need a token is decided by the
/// `auth.protected` patterns applied in the gate middleware.
///
/// The fallback keeps unknown API paths behind the gate, so they count
/// against the rate limit instead of reaching the static file service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_info).post(login::login))
        .route("/validate-token", post(token::validate_token))
        .route("/terminal/execute", post(terminal::execute))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
