use std::sync::Arc;
use std::time::Duration;

use turnstile_core::ratelimit::rules_from_specs;
use turnstile_core::{
    Authenticator, Clock, ConfigError, CredentialStore, EndpointPattern, JsonFileStore, Pipeline,
    RateLimiter, SystemClock, TokenIssuer, TokenSettings, TokenValidator,
};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub authenticator: Arc<Authenticator>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Builds the production state: users from the configured JSON file,
    /// real time.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(JsonFileStore::new(config.auth.users_file.clone()));
        Self::build(config, store, Arc::new(SystemClock))
    }

    /// Fails if any token setting is blank or any rule or protected
    /// pattern is invalid.
    pub fn build(
        config: ServerConfig,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let settings = TokenSettings::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_issuer.clone(),
            config.auth.jwt_audience.clone(),
        )?;

        let rules = rules_from_specs(&config.rate_limit.rules)?;
        let protected = config
            .auth
            .protected
            .iter()
            .map(|p| EndpointPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let issuer = Arc::new(TokenIssuer::with_clock(&settings, clock.clone()));
        let validator = Arc::new(TokenValidator::with_clock(&settings, clock.clone()));
        let limiter = Arc::new(RateLimiter::with_clock(rules, clock));

        let authenticator = Authenticator::new(store, issuer)
            .with_lookup_timeout(Duration::from_millis(config.auth.lookup_timeout_ms));

        tracing::info!(
            "Token issuer {:?}, audience {:?}; {} rate limit rule(s); protected: {:?}",
            settings.issuer(),
            settings.audience(),
            limiter.rules().len(),
            config.auth.protected
        );

        Ok(Self {
            config: Arc::new(config),
            authenticator: Arc::new(authenticator),
            pipeline: Arc::new(Pipeline::new(limiter, validator, protected)),
        })
    }
}
