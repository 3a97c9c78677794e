/*!
 * Permissions Module
 * Runtime policy decisions for module privilege checks
 *
 * A decision table holds one ordered rule snapshot and its private cache.
 * Rules grant, deny, abstain or postpone; the combiner merges those results
 * in priority order, deferring to the host when a postponement cannot be
 * settled now. The checkpoint owns the current table and swaps it on
 * policy commit.
 *
 * ## Usage
 * ```ignore
 * use ai_os_permadmin::permissions::{DecisionSource, DecisionTable, PolicyCheckpoint};
 *
 * let checkpoint = PolicyCheckpoint::new(DecisionTable::new(rules));
 * if checkpoint.implies(&subject, &PrivilegeRequest::file("/data", "read")) {
 *     // Perform operation
 * }
 *
 * // Policy reload: new table, new cache
 * checkpoint.commit(DecisionTable::new(new_rules));
 * ```
 */

pub mod audit;
pub mod cache;
pub mod deferred;
pub mod manager;
pub mod policy;
pub mod table;
pub mod types;

// Re-export commonly used items
pub use audit::{AuditEvent, AuditLogger, AuditSeverity, AuditStats};
pub use cache::{CacheKey, CacheStats, CachedValue, DecisionCache};
pub use deferred::{DeferredCheckQueue, DeferredStats, PendingCheck, ResolvedCheck};
pub use manager::{CheckpointStats, PolicyCheckpoint, PolicySnapshot};
pub use policy::{Combination, DecisionCombiner};
pub use table::{DecisionTable, DecisionTableBuilder, SubjectScope, TableStats};
pub use types::{
    Condition, Decision, DecisionSource, DeferredCheck, DeferredCheckHost, DeferredCheckSink,
    FixedSinkHost, NoDeferredChecks, Outcome, PostponedDecision, Rule, RuleDecision,
};
