//! Per-client request throttling.

mod limiter;
mod rule;

pub use limiter::{Admission, RateLimiter, Throttle};
pub use rule::{default_rule_specs, parse_period, EndpointPattern, RateLimitRule, RuleSpec};

use crate::error::RuleError;

/// Builds validated rules from configuration entries, in order.
pub fn rules_from_specs(specs: &[RuleSpec]) -> Result<Vec<RateLimitRule>, RuleError> {
    specs.iter().map(RateLimitRule::try_from).collect()
}
