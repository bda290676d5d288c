use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::{PresentedClaims, TokenSettings};
use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::identity::Claims;

/// Verifies tokens produced by [`super::TokenIssuer`].
///
/// Checks run in a fixed order and the first failure is reported:
/// signature, issuer, audience, expiry, then the `name` and `code` claims.
/// No clock skew is tolerated. Nothing is looked up server-side.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(settings: &TokenSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        // jsonwebtoken only verifies the signature; registered claims are
        // checked below against the injected clock and in our own order.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            decoding_key: DecodingKey::from_secret(settings.key_bytes()),
            validation,
            issuer: settings.issuer().to_string(),
            audience: settings.audience().to_string(),
            clock,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
        let presented = decode::<PresentedClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    ValidationError::InvalidSignature
                }
                _ => ValidationError::Malformed(e.to_string()),
            })?
            .claims;

        if presented.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(ValidationError::InvalidIssuer);
        }

        if !presented
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.audience))
        {
            return Err(ValidationError::InvalidAudience);
        }

        let exp = presented.exp.ok_or(ValidationError::MissingClaim("exp"))?;
        if self.clock.unix_now() >= exp {
            return Err(ValidationError::Expired);
        }

        let name = non_empty(presented.name).ok_or(ValidationError::MissingClaim("name"))?;
        let code = non_empty(presented.code).ok_or(ValidationError::MissingClaim("code"))?;

        tracing::debug!("Token validated for: {name}");
        Ok(Claims { name, code })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
