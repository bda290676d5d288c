//! Per-request gatekeeping: throttle, authenticate, authorize.
//!
//! [`Pipeline::check`] always runs the stages in that order. A flood of bad
//! tokens is therefore still throttled, and authorization never sees
//! claims that were not verified first.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::identity::Claims;
use crate::ratelimit::{Admission, EndpointPattern, RateLimiter, Throttle};
use crate::token::TokenValidator;

/// The parts of an HTTP request the pipeline looks at.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub client_key: &'a str,
    pub path: &'a str,
    /// Raw `Authorization` header value, if any.
    pub authorization: Option<&'a str>,
}

/// What a request that got through carries to its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passage {
    /// Unprotected path; no token was required.
    Public,
    /// Protected path; verified and authorized claims.
    Authenticated(Claims),
}

/// Why authentication failed. Only logged; clients see a generic answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    NotBearer,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("rate limit exceeded on {}", .0.endpoint)]
    Throttled(Throttle),

    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthFailure),

    /// The token verified but a claim is not usable.
    #[error("unusable {0} claim")]
    Forbidden(&'static str),
}

pub struct Pipeline {
    limiter: Arc<RateLimiter>,
    validator: Arc<TokenValidator>,
    protected: Vec<EndpointPattern>,
}

impl Pipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        validator: Arc<TokenValidator>,
        protected: Vec<EndpointPattern>,
    ) -> Self {
        Self {
            limiter,
            validator,
            protected,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|pattern| pattern.matches(path))
    }

    pub fn check(&self, request: &InboundRequest<'_>) -> Result<Passage, Rejection> {
        if let Admission::Throttled(throttle) =
            self.limiter.admit(request.client_key, request.path)
        {
            return Err(Rejection::Throttled(throttle));
        }

        if !self.is_protected(request.path) {
            return Ok(Passage::Public);
        }

        let claims = self
            .authenticate(request.authorization)
            .map_err(Rejection::Unauthenticated)?;
        authorize(&claims)?;

        Ok(Passage::Authenticated(claims))
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, AuthFailure> {
        let token = bearer_token(authorization)?;
        Ok(self.validator.validate(token)?)
    }
}

/// Extracts the token from `Bearer <token>`. The scheme is matched
/// case-insensitively.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthFailure> {
    let header = authorization
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(AuthFailure::MissingHeader)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthFailure::NotBearer)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthFailure::NotBearer);
    }
    Ok(token)
}

/// Verified claims must also be usable: not blank and free of control
/// characters.
pub fn authorize(claims: &Claims) -> Result<(), Rejection> {
    if !usable(&claims.name) {
        return Err(Rejection::Forbidden("name"));
    }
    if !usable(&claims.code) {
        return Err(Rejection::Forbidden("code"));
    }
    Ok(())
}

fn usable(value: &str) -> bool {
    !value.trim().is_empty() && !value.chars().any(char::is_control)
}
