//! Signed bearer tokens.
//!
//! Tokens are compact HS256 JWS strings whose payload carries `name`,
//! `code`, `iss`, `aud` and `exp`. They are not encrypted: anything in the
//! payload is readable by whoever holds the token.

mod issuer;
mod validator;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use issuer::{IssuedToken, TokenIssuer};
pub use validator::TokenValidator;

/// Lifetime of every issued token.
pub const TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Signing key, issuer and audience shared by the issuer and the validator.
///
/// Built once at startup; [`TokenSettings::new`] refuses blank values so a
/// misconfigured service fails before it accepts traffic.
#[derive(Clone)]
pub struct TokenSettings {
    signing_key: String,
    issuer: String,
    audience: String,
}

impl TokenSettings {
    pub fn new(
        signing_key: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let signing_key = signing_key.into();
        let issuer = issuer.into();
        let audience = audience.into();

        if signing_key.trim().is_empty() {
            return Err(ConfigError::MissingSigningKey);
        }
        if issuer.trim().is_empty() {
            return Err(ConfigError::MissingIssuer);
        }
        if audience.trim().is_empty() {
            return Err(ConfigError::MissingAudience);
        }

        Ok(Self {
            signing_key,
            issuer,
            audience,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    fn key_bytes(&self) -> &[u8] {
        self.signing_key.as_bytes()
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SignedClaims<'a> {
    name: &'a str,
    code: &'a str,
    iss: &'a str,
    aud: &'a str,
    exp: u64,
}

/// Payload as read back from a token. Every field is optional here so the
/// validator can report exactly which one is missing.
#[derive(Debug, Deserialize)]
struct PresentedClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    exp: Option<u64>,
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}
