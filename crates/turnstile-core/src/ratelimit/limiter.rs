use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::rule::RateLimitRule;
use crate::clock::{Clock, SystemClock};

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Throttled(Throttle),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Which rule rejected the request and when its window reopens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    pub endpoint: String,
    pub limit: u32,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    client: String,
    rule: usize,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed-window request counter per `(client, rule)`.
///
/// A request is checked against the most specific non-catch-all rule that
/// matches its path, then against every catch-all rule. Each counter is
/// reset, incremented and compared while its map entry is locked, so
/// concurrent requests from one client can never both slip under a limit.
/// Counters are sharded across the map; unrelated clients rarely contend.
///
/// State is in-memory and per-process.
pub struct RateLimiter {
    rules: Vec<RateLimitRule>,
    counters: DashMap<CounterKey, Window>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self::with_clock(rules, Arc::new(SystemClock))
    }

    pub fn with_clock(rules: Vec<RateLimitRule>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            counters: DashMap::new(),
            clock,
        }
    }

    pub fn rules(&self) -> &[RateLimitRule] {
        &self.rules
    }

    /// Counts one request from `client` to `path` and decides whether to
    /// let it through. Rules after the one that throttles are not counted.
    pub fn admit(&self, client: &str, path: &str) -> Admission {
        for rule_idx in self.applicable_rules(path) {
            let rule = &self.rules[rule_idx];
            let now = self.clock.now();

            let mut window = self
                .counters
                .entry(CounterKey {
                    client: client.to_string(),
                    rule: rule_idx,
                })
                .or_insert(Window {
                    start: now,
                    count: 0,
                });

            if now.saturating_duration_since(window.start) > rule.window {
                window.start = now;
                window.count = 0;
            }
            window.count = window.count.saturating_add(1);

            if window.count > rule.limit {
                let retry_after = (window.start + rule.window).saturating_duration_since(now);
                tracing::warn!(
                    "Rate limit exceeded for {client} on {path} (rule {}: {} per {:?})",
                    rule.pattern,
                    rule.limit,
                    rule.window
                );
                return Admission::Throttled(Throttle {
                    endpoint: rule.pattern.to_string(),
                    limit: rule.limit,
                    retry_after,
                });
            }
        }
        Admission::Admitted
    }

    /// Drops counters whose window has elapsed.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|key, window| {
            now.saturating_duration_since(window.start) <= self.rules[key.rule].window
        });
        let purged = before.saturating_sub(self.counters.len());
        if purged > 0 {
            tracing::debug!("Purged {purged} expired rate limit counters");
        }
    }

    /// Number of live counters.
    pub fn tracked_counters(&self) -> usize {
        self.counters.len()
    }

    fn applicable_rules(&self, path: &str) -> Vec<usize> {
        let specific = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| !rule.pattern.is_catch_all() && rule.pattern.matches(path))
            .max_by_key(|(_, rule)| rule.pattern.specificity())
            .map(|(idx, _)| idx);

        let catch_all = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.pattern.is_catch_all())
            .map(|(idx, _)| idx);

        specific.into_iter().chain(catch_all).collect()
    }
}
