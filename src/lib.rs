/*!
 * AI-OS Permission Admin
 * Policy decision engine for module privilege checks
 */

pub mod core;
pub mod monitoring;
pub mod permissions;

// Re-exports
pub use crate::core::{
    PolicyConfig, PolicyError, PolicyResult, PrivilegeRequest, RuleError, SubjectIdentity,
};
pub use monitoring::init_tracing;
pub use permissions::{
    Condition, Decision, DecisionSource, DecisionTable, DeferredCheck, DeferredCheckHost,
    DeferredCheckQueue, DeferredCheckSink, Outcome, PolicyCheckpoint, Rule, RuleDecision,
};
