/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy construction and configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PolicyError {
    #[error("Decision table built without a rule set")]
    #[diagnostic(
        code(policy::rules_missing),
        help("Supply a rule sequence before building. An empty sequence is valid and abstains on every request.")
    )]
    RulesMissing,

    #[error("Invalid version '{0}'")]
    #[diagnostic(
        code(policy::invalid_version),
        help("Module versions use the MAJOR.MINOR.PATCH form, e.g. 1.4.0.")
    )]
    InvalidVersion(String),

    #[error("Invalid configuration: {key}={value}")]
    #[diagnostic(
        code(policy::invalid_config),
        help("Check the POLICY_* environment variables.")
    )]
    InvalidConfig { key: String, value: String },
}

/// Errors a rule may report while evaluating a request
///
/// These never escape the decision table: the rule is treated as abstaining.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RuleError {
    #[error("Rule '{rule}' failed: {reason}")]
    #[diagnostic(code(rule::evaluation_failed))]
    EvaluationFailed { rule: String, reason: String },

    #[error("Condition '{condition}' unavailable: {reason}")]
    #[diagnostic(code(rule::condition_unavailable))]
    ConditionUnavailable { condition: String, reason: String },
}

impl RuleError {
    pub fn evaluation_failed(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EvaluationFailed {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for policy operations
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;
