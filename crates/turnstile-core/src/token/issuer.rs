use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use super::{SignedClaims, TokenSettings, TOKEN_TTL};
use crate::clock::{Clock, SystemClock};
use crate::identity::Identity;

/// A freshly signed token and its expiry as Unix seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.key_bytes()),
            issuer: settings.issuer().to_string(),
            audience: settings.audience().to_string(),
            clock,
        }
    }

    /// Signs a token carrying the identity's display name and code.
    pub fn issue(&self, identity: &Identity) -> jsonwebtoken::errors::Result<IssuedToken> {
        let expires_at = self.clock.unix_now() + TOKEN_TTL.as_secs();

        let claims = SignedClaims {
            name: &identity.display_name,
            code: &identity.code,
            iss: &self.issuer,
            aud: &self.audience,
            exp: expires_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        tracing::info!("Issued token for: {}", identity.display_name);
        tracing::debug!("Generated token: {token}");

        Ok(IssuedToken { token, expires_at })
    }
}
