use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::auth::middleware::AuthUser;
use crate::dto::{CommandRequest, CommandResponse};
use crate::error::AppError;

pub async fn execute(
    user: AuthUser,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    tracing::info!("Command execution requested by user: {}", user.name);

    Ok(Json(CommandResponse {
        output: process_command(&request.command),
    }))
}

/// The toy shell behind `/api/terminal/execute`. Command names are
/// case-insensitive; `echo` returns its argument verbatim.
pub fn process_command(command: &str) -> String {
    if let Some(message) = command
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("echo "))
        .map(|_| &command[5..])
    {
        return message.to_string();
    }

    match command.to_lowercase().as_str() {
        "help" => "Available commands: help, clear, logout, echo [message]".to_string(),
        "clear" => "Terminal cleared. (Client-side)".to_string(),
        "logout" => "Log out to leave the terminal.".to_string(),
        _ => format!("Unrecognized command: {command}"),
    }
}
