/*!
 * System Limits and Constants
 *
 * Centralized location for policy engine limits and defaults.
 */

// =============================================================================
// DECISION CACHE
// =============================================================================

/// Default decision cache capacity (10K entries)
/// Sized for one entry per (module, privilege) pair seen by a busy container
/// [PERF] Pre-allocated so the hot path never rehashes during warm-up
pub const DEFAULT_DECISION_CACHE_CAPACITY: usize = 10_000;

/// Smallest accepted cache capacity
pub const MIN_DECISION_CACHE_CAPACITY: usize = 16;

// =============================================================================
// DEFERRED CHECKS
// =============================================================================

/// Maximum unresolved deferred checks held by one queue
/// [SECURITY] POSTPONED is never cached, so every repeat registers again
pub const MAX_PENDING_DEFERRED_CHECKS: usize = 10_000;

/// Maximum unresolved checks kept for one (subject, request) pair
/// Older ones are superseded by newer registrations
pub const MAX_PENDING_CHECKS_PER_REQUEST: usize = 16;

// =============================================================================
// AUDIT
// =============================================================================

/// Maximum audit events kept in the global ring buffer
/// [SECURITY] Bounded so a noisy module cannot exhaust memory
pub const MAX_AUDIT_EVENTS: usize = 10_000;

/// Maximum audit events kept per subject
pub const MAX_AUDIT_EVENTS_PER_SUBJECT: usize = 100;

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_CACHE_CAPACITY: &str = "POLICY_CACHE_CAPACITY";
pub const ENV_AUDIT: &str = "POLICY_AUDIT";
pub const ENV_TRACE_JSON: &str = "POLICY_TRACE_JSON";
