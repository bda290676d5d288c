use axum::extract::{OriginalUri, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tower_governor::key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor};
use turnstile_core::{InboundRequest, Passage};

use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Rate limit, then authenticate and authorize protected paths.
///
/// Layered on the `/api` router, so it sees every API request before any
/// handler runs.
pub async fn gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&req, state.config.rate_limit.trust_forwarded_headers);
    // Nested routers see a stripped URI; rules are written against the full path.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let passage = state.pipeline.check(&InboundRequest {
        client_key: &client,
        path: &path,
        authorization,
    })?;

    if let Passage::Authenticated(claims) = passage {
        tracing::debug!("Request to {path} by {}", claims.name);
        req.extensions_mut().insert(AuthUser {
            name: claims.name,
            code: claims.code,
        });
    }

    Ok(next.run(req).await)
}

/// The peer address, or with `trust_forwarded` the client IP from
/// `X-Forwarded-For` / `X-Real-IP` / `Forwarded` falling back to the peer.
/// Requests with no derivable IP share one bucket.
fn client_key(req: &Request, trust_forwarded: bool) -> String {
    let ip = if trust_forwarded {
        SmartIpKeyExtractor.extract(req)
    } else {
        PeerIpKeyExtractor.extract(req)
    };
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
