use serde::{Deserialize, Serialize};

pub use turnstile_core::LoginRequest;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub name: String,
    pub code: String,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
pub struct LoginInfoResponse {
    pub message: String,
    pub example: LoginExample,
}

#[derive(Debug, Serialize)]
pub struct LoginExample {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimsResponse {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub output: String,
}
