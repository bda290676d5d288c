//! Error types for `turnstile-core`.
//!
//! Each operation has its own error enum so callers can tell startup
//! failures ([`ConfigError`]) apart from per-request failures
//! ([`ValidationError`], [`LoginError`]).

use std::path::PathBuf;

/// A required setting is missing or invalid. Raised once at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No token signing key was configured.
    #[error("token signing key is missing from configuration")]
    MissingSigningKey,

    /// No token issuer was configured.
    #[error("token issuer is missing from configuration")]
    MissingIssuer,

    /// No token audience was configured.
    #[error("token audience is missing from configuration")]
    MissingAudience,

    /// A rate-limit rule could not be built.
    #[error("invalid rate limit rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// A rate-limit rule definition is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The endpoint pattern is empty or does not start with `/`.
    #[error("invalid endpoint pattern: {0:?}")]
    InvalidPattern(String),

    /// The period string is not `<number><s|m|h|d>`.
    #[error("invalid period: {0:?}")]
    InvalidPeriod(String),

    /// A limit of zero would reject every request.
    #[error("limit for {0:?} must be at least 1")]
    ZeroLimit(String),
}

/// Why a token was rejected.
///
/// The variants are for server-side diagnostics. At the HTTP boundary they
/// all collapse into one generic "unauthorized" answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The token is not a well-formed compact JWS.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not verify against the configured key.
    #[error("invalid signature")]
    InvalidSignature,

    /// `iss` does not match the configured issuer.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// `aud` does not match the configured audience.
    #[error("invalid audience")]
    InvalidAudience,

    /// The token is at or past its `exp`.
    #[error("token expired")]
    Expired,

    /// A required claim is absent or empty.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
}

/// The credential store could not be consulted.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file does not exist.
    #[error("credential store not found: {0}")]
    NotFound(PathBuf),

    /// The backing file holds no users.
    #[error("credential store is empty: {0}")]
    Empty(PathBuf),

    /// The backing file could not be parsed.
    #[error("credential store is malformed: {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The lookup did not finish within the configured timeout.
    #[error("credential store lookup timed out")]
    Timeout,

    /// An I/O error other than "not found".
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed login attempt.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Username or password is blank.
    #[error("username and password are required")]
    InvalidInput,

    /// No identity matches the supplied credentials.
    #[error("invalid username or password")]
    Unauthorized,

    /// The credential store is unavailable; this is a server-side fault.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Signing the token failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}
