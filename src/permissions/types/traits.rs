/*!
 * Permission Traits
 * Seams between the decision engine, policy rules and the host container
 */

use super::core::{Decision, RuleDecision};
use crate::core::errors::RuleError;
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use std::fmt::Debug;
use std::sync::Arc;

/// Predicate attached to a rule
pub trait Condition: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Whether the truth of this condition can change between checks
    ///
    /// Fixed at construction.
    fn is_mutable(&self) -> bool;

    /// Force the condition to a concrete value at operation time
    fn is_satisfied(&self, subject: &SubjectIdentity) -> bool;
}

/// One ordered policy entry
pub trait Rule: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Conditions relevant to the subject, if any
    fn conditions(&self, subject: &SubjectIdentity) -> Option<Vec<Arc<dyn Condition>>>;

    /// Evaluate a request into a single decision
    fn evaluate(
        &self,
        subject: &SubjectIdentity,
        request: &PrivilegeRequest,
    ) -> Result<RuleDecision, RuleError>;

    /// Serialized form of this rule; the encoding is owned by the rule
    fn encoded(&self) -> String;
}

/// Unresolved postponement handed to the host for check-time resolution
#[derive(Debug, Clone)]
pub struct DeferredCheck {
    pub subject: SubjectIdentity,
    pub request: PrivilegeRequest,
    /// Per-rule decisions in rule order, up to and including the immediate one
    pub decisions: Vec<RuleDecision>,
}

/// Host mechanism that resolves postponed decisions when the operation runs
pub trait DeferredCheckSink: Send + Sync {
    fn register_postponed(&self, check: DeferredCheck);
}

/// Container accessor for the deferred check sink
pub trait DeferredCheckHost: Send + Sync {
    /// `None` when the host cannot defer checks
    fn deferred_sink(&self) -> Option<Arc<dyn DeferredCheckSink>>;
}

/// Host without deferred check support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeferredChecks;

impl DeferredCheckHost for NoDeferredChecks {
    fn deferred_sink(&self) -> Option<Arc<dyn DeferredCheckSink>> {
        None
    }
}

/// Host that always hands out the same sink
#[derive(Clone)]
pub struct FixedSinkHost(pub Arc<dyn DeferredCheckSink>);

impl DeferredCheckHost for FixedSinkHost {
    fn deferred_sink(&self) -> Option<Arc<dyn DeferredCheckSink>> {
        Some(Arc::clone(&self.0))
    }
}

/// Core decision interface consumed by the access-control checkpoint
pub trait DecisionSource: Send + Sync {
    fn evaluate(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> Decision;

    /// True iff the evaluated decision carries the GRANTED bit
    fn implies(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> bool {
        self.evaluate(subject, request).is_granted()
    }

    /// Evaluate several requests for one subject
    fn evaluate_batch(
        &self,
        subject: &SubjectIdentity,
        requests: &[PrivilegeRequest],
    ) -> Vec<Decision> {
        requests
            .iter()
            .map(|req| self.evaluate(subject, req))
            .collect()
    }
}
