use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use turnstile_core::ratelimit::{default_rule_specs, RuleSpec};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default)]
    pub jwt_issuer: String,
    #[serde(default)]
    pub jwt_audience: String,
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Endpoint patterns that require a bearer token.
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rule_specs")]
    pub rules: Vec<RuleSpec>,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` / `Forwarded` instead
    /// of the peer address. Only enable behind a proxy that overwrites them.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API cross-origin. Empty means same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: String::new(),
            jwt_audience: String::new(),
            users_file: default_users_file(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            protected: default_protected(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rules: default_rule_specs(),
            purge_interval_secs: default_purge_interval_secs(),
            trust_forwarded_headers: false,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self { dir: default_static_dir() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            static_files: StaticFilesConfig::default(),
            tls: TlsConfig::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5046))
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_lookup_timeout_ms() -> u64 { 5_000 }
fn default_purge_interval_secs() -> u64 { 60 }
fn default_max_body_bytes() -> usize { 1024 * 1024 }

fn default_static_dir() -> PathBuf {
    PathBuf::from("wwwroot")
}

fn default_protected() -> Vec<String> {
    vec!["/api/validate-token".to_string(), "/api/terminal/*".to_string()]
}

const WEAK_SECRETS: &[&str] = &[
    "change-me-to-a-random-secret",
    "secret",
    "password",
    "jwt-secret",
];

impl ServerConfig {
    /// Reads `TURNSTILE_CONFIG` (TOML) if set, then applies environment
    /// overrides. Missing token settings are not defaulted: startup fails
    /// later in [`crate::state::AppState::from_config`].
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("TURNSTILE_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)?;
                toml::from_str(&contents)?
            }
            Err(_) => ServerConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.check_secret_strength()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(secret) = var("TURNSTILE_JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = secret;
        }
        if self.auth.jwt_secret.is_empty() {
            if let Some(secret) = var("SECRET_KEY").filter(|s| !s.is_empty()) {
                self.auth.jwt_secret = secret;
            }
        }
        if let Some(issuer) = var("TURNSTILE_JWT_ISSUER") {
            self.auth.jwt_issuer = issuer;
        }
        if let Some(audience) = var("TURNSTILE_JWT_AUDIENCE") {
            self.auth.jwt_audience = audience;
        }
        if let Some(users) = var("TURNSTILE_USERS_FILE") {
            self.auth.users_file = PathBuf::from(users);
        }
        if let Some(dir) = var("TURNSTILE_STATIC_DIR") {
            self.static_files.dir = PathBuf::from(dir);
        }
        if let Some(addr) = var("TURNSTILE_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Some(trust) = var("TURNSTILE_TRUST_FORWARDED_HEADERS") {
            self.rate_limit.trust_forwarded_headers = trust.parse()?;
        }
        if let Some(cert) = var("TURNSTILE_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Some(key) = var("TURNSTILE_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        Ok(())
    }

    pub fn check_secret_strength(&self) -> anyhow::Result<()> {
        let secret = &self.auth.jwt_secret;
        if WEAK_SECRETS.iter().any(|&w| secret == w) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via TURNSTILE_JWT_SECRET."
            );
        }
        // HS256 wants at least 256 bits of key.
        if !secret.is_empty() && secret.len() < 32 {
            tracing::warn!(
                "JWT secret is shorter than 32 characters. \
                 Consider using a stronger secret via TURNSTILE_JWT_SECRET."
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use turnstile_core::ratelimit::rules_from_specs;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 5046);
        assert_eq!(config.auth.users_file, PathBuf::from("users.json"));
        assert_eq!(config.auth.lookup_timeout_ms, 5_000);
        assert_eq!(config.rate_limit.rules, default_rule_specs());
        assert_eq!(config.static_files.dir, PathBuf::from("wwwroot"));
        assert!(config.auth.jwt_secret.is_empty());
        assert!(!config.tls.enabled());
        assert!(!config.rate_limit.trust_forwarded_headers);
    }

    #[test]
    fn parses_full_toml() {
        let config = ServerConfig::from_toml(
            r#"
bind_addr = "127.0.0.1:8080"
max_body_bytes = 4096

[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"
jwt_issuer = "turnstile"
jwt_audience = "clients"
users_file = "/etc/turnstile/users.json"
lookup_timeout_ms = 250
protected = ["/api/private/*"]

[rate_limit]
trust_forwarded_headers = true

[[rate_limit.rules]]
endpoint = "/api/login"
limit = 3
period = "30s"

[[rate_limit.rules]]
endpoint = "*"
limit = 50
period = "1m"

[cors]
allowed_origins = ["https://example.com"]

[tls]
cert_path = "cert.pem"
key_path = "key.pem"
"#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_body_bytes, 4096);
        assert_eq!(config.auth.jwt_issuer, "turnstile");
        assert_eq!(config.auth.lookup_timeout_ms, 250);
        assert_eq!(config.auth.protected, vec!["/api/private/*".to_string()]);
        assert_eq!(config.cors.allowed_origins, vec!["https://example.com".to_string()]);
        assert!(config.tls.enabled());

        assert!(config.rate_limit.trust_forwarded_headers);

        let rules = rules_from_specs(&config.rate_limit.rules).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].limit, 3);
        assert_eq!(rules[0].window, Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = ServerConfig::from_toml("[auth]\njwt_issuer = \"x\"\n").unwrap();
        assert_eq!(config.auth.jwt_issuer, "x");
        assert_eq!(config.auth.protected, default_protected());
        assert_eq!(config.rate_limit.rules, default_rule_specs());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("TURNSTILE_JWT_SECRET", "from-env-0123456789abcdef0123456789"),
                ("TURNSTILE_JWT_ISSUER", "iss"),
                ("TURNSTILE_JWT_AUDIENCE", "aud"),
                ("TURNSTILE_BIND_ADDR", "127.0.0.1:9000"),
                ("TURNSTILE_USERS_FILE", "/tmp/u.json"),
            ]))
            .unwrap();

        assert_eq!(config.auth.jwt_secret, "from-env-0123456789abcdef0123456789");
        assert_eq!(config.auth.jwt_issuer, "iss");
        assert_eq!(config.auth.jwt_audience, "aud");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.auth.users_file, PathBuf::from("/tmp/u.json"));
    }

    #[test]
    fn secret_key_is_a_fallback_only() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("SECRET_KEY", "fallback")])).unwrap();
        assert_eq!(config.auth.jwt_secret, "fallback");

        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "configured".to_string();
        config.apply_env(env(&[("SECRET_KEY", "fallback")])).unwrap();
        assert_eq!(config.auth.jwt_secret, "configured");
    }

    #[test]
    fn forwarded_header_trust_is_opt_in_from_env() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[("TURNSTILE_TRUST_FORWARDED_HEADERS", "true")]))
            .unwrap();
        assert!(config.rate_limit.trust_forwarded_headers);

        let mut config = ServerConfig::default();
        assert!(config
            .apply_env(env(&[("TURNSTILE_TRUST_FORWARDED_HEADERS", "yes please")]))
            .is_err());
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        let mut config = ServerConfig::default();
        assert!(config
            .apply_env(env(&[("TURNSTILE_BIND_ADDR", "not-an-address")]))
            .is_err());
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "secret".to_string();
        assert!(config.check_secret_strength().is_err());

        config.auth.jwt_secret = "short-but-not-a-placeholder".to_string();
        assert!(config.check_secret_strength().is_ok());
    }
}
