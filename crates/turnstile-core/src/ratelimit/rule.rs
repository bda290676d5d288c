use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Which request paths a rule applies to.
///
/// Matching ignores ASCII case and a trailing `/`, so `/API/Login/` is
/// counted against the `/api/login` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointPattern {
    /// `*`: every path.
    Any,
    /// `/api/*`: the prefix itself and everything below it.
    Prefix(String),
    /// `/api/login`: that path only.
    Exact(String),
}

impl EndpointPattern {
    pub fn parse(pattern: &str) -> Result<Self, RuleError> {
        let trimmed = pattern.trim();
        if trimmed == "*" {
            return Ok(Self::Any);
        }
        if !trimmed.starts_with('/') {
            return Err(RuleError::InvalidPattern(pattern.to_string()));
        }
        if let Some(prefix) = trimmed.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(RuleError::InvalidPattern(pattern.to_string()));
            }
            return Ok(Self::Prefix(normalize(prefix)));
        }
        if trimmed.contains('*') {
            return Err(RuleError::InvalidPattern(pattern.to_string()));
        }
        Ok(Self::Exact(normalize(trimmed)))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => normalize(path) == *exact,
            Self::Prefix(prefix) => {
                let path = normalize(path);
                prefix.is_empty()
                    || path == *prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Higher is more specific: exact paths beat prefixes, longer prefixes
    /// beat shorter ones, and `*` is least specific.
    pub fn specificity(&self) -> (u8, usize) {
        match self {
            Self::Any => (0, 0),
            Self::Prefix(prefix) => (1, prefix.len()),
            Self::Exact(exact) => (2, exact.len()),
        }
    }
}

impl fmt::Display for EndpointPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Exact(exact) => f.write_str(exact),
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        return "/".to_string();
    }
    trimmed.to_ascii_lowercase()
}

/// Rule as written in configuration:
///
/// ```toml
/// [[rate_limit.rules]]
/// endpoint = "/api/login"
/// limit = 5
/// period = "1m"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub endpoint: String,
    pub limit: u32,
    pub period: String,
}

impl RuleSpec {
    pub fn new(endpoint: &str, limit: u32, period: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            limit,
            period: period.to_string(),
        }
    }
}

/// `/api/login` at 5 per minute and everything at 100 per minute.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new("/api/login", 5, "1m"),
        RuleSpec::new("*", 100, "1m"),
    ]
}

/// At most `limit` requests per client per `window` on matching paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    pub pattern: EndpointPattern,
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    pub fn new(pattern: EndpointPattern, limit: u32, window: Duration) -> Self {
        Self {
            pattern,
            limit,
            window,
        }
    }
}

impl TryFrom<&RuleSpec> for RateLimitRule {
    type Error = RuleError;

    fn try_from(spec: &RuleSpec) -> Result<Self, Self::Error> {
        if spec.limit == 0 {
            return Err(RuleError::ZeroLimit(spec.endpoint.clone()));
        }
        Ok(Self {
            pattern: EndpointPattern::parse(&spec.endpoint)?,
            limit: spec.limit,
            window: parse_period(&spec.period)?,
        })
    }
}

/// Parses `"30s"`, `"1m"`, `"2h"` or `"1d"`.
pub fn parse_period(period: &str) -> Result<Duration, RuleError> {
    let invalid = || RuleError::InvalidPeriod(period.to_string());
    let period = period.trim();
    let unit_at = period.len().checked_sub(1).ok_or_else(invalid)?;
    if !period.is_char_boundary(unit_at) {
        return Err(invalid());
    }
    let (amount, unit) = period.split_at(unit_at);
    let amount: u64 = amount.parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }
    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return Err(invalid()),
    };
    amount
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
