//! Username/password login.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{LoginError, StoreError};
use crate::identity::LoginRequest;
use crate::store::CredentialStore;
use crate::token::TokenIssuer;

/// Default upper bound on a single credential-store lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: u64,
    pub name: String,
    pub code: String,
}

/// Checks credentials against a [`CredentialStore`] and issues a token on
/// success.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    lookup_timeout: Duration,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            issuer,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// - [`LoginError::InvalidInput`] if either field is blank. The store is
    ///   not consulted.
    /// - [`LoginError::Unauthorized`] if no record matches both username and
    ///   password. Unknown users and wrong passwords are indistinguishable.
    /// - [`LoginError::StoreUnavailable`] if the store cannot be read, is
    ///   empty or malformed, or does not answer within the timeout.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, LoginError> {
        if !request.is_complete() {
            return Err(LoginError::InvalidInput);
        }

        let found = tokio::time::timeout(
            self.lookup_timeout,
            self.store.find(&request.username, &request.password),
        )
        .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|e| {
                tracing::error!("Credential store unavailable: {e}");
                e
            })?;

        let Some(identity) = found else {
            tracing::warn!("Failed login attempt for user: {}", request.username);
            return Err(LoginError::Unauthorized);
        };

        let issued = self
            .issuer
            .issue(&identity)
            .map_err(|e| LoginError::Signing(e.to_string()))?;

        tracing::info!("Login successful for user: {}", identity.display_name);

        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.expires_at,
            name: identity.display_name,
            code: identity.code,
        })
    }
}
