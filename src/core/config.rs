/*!
 * Policy Configuration
 * Runtime knobs for the decision engine, read from the environment
 *
 * Environment variables:
 * - POLICY_CACHE_CAPACITY: decision cache capacity (default: 10000)
 * - POLICY_AUDIT: record an audit trail of decisions (default: false)
 * - POLICY_TRACE_JSON: JSON log output (default: false)
 */

use super::errors::{PolicyError, PolicyResult};
use super::limits::{
    DEFAULT_DECISION_CACHE_CAPACITY, ENV_AUDIT, ENV_CACHE_CAPACITY, ENV_TRACE_JSON,
    MIN_DECISION_CACHE_CAPACITY,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Maximum entries held by each decision table's cache
    pub cache_capacity: usize,
    /// Whether the checkpoint keeps an audit trail
    pub audit_enabled: bool,
    /// Whether tracing output is JSON formatted
    pub trace_json: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_DECISION_CACHE_CAPACITY,
            audit_enabled: false,
            trace_json: false,
        }
    }
}

impl PolicyConfig {
    /// Load configuration from `POLICY_*` environment variables
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> PolicyResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_CACHE_CAPACITY) {
            config.cache_capacity = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity >= MIN_DECISION_CACHE_CAPACITY)
                .ok_or_else(|| invalid(ENV_CACHE_CAPACITY, &raw))?;
        }
        if let Ok(raw) = std::env::var(ENV_AUDIT) {
            config.audit_enabled = parse_flag(ENV_AUDIT, &raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_TRACE_JSON) {
            config.trace_json = parse_flag(ENV_TRACE_JSON, &raw)?;
        }

        Ok(config)
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(MIN_DECISION_CACHE_CAPACITY);
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> PolicyResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}

fn invalid(key: &str, raw: &str) -> PolicyError {
    PolicyError::InvalidConfig {
        key: key.to_string(),
        value: raw.to_string(),
    }
}
