/*!
 * Rule Isolation
 * Boundary around every rule invocation
 *
 * A rule that returns an error or panics is treated as abstaining; a rule
 * whose condition probe panics is treated as mutable. Nothing a rule does
 * can escape into the caller's evaluation.
 */

use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use crate::permissions::types::{Rule, RuleDecision};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Rule result after isolation
#[derive(Debug)]
pub struct Isolated {
    pub decision: RuleDecision,
    /// Whether the rule failed and was coerced to ABSTAIN
    pub faulted: bool,
}

/// Evaluate a rule, converting errors and panics to ABSTAIN
pub fn evaluate_isolated(
    rule: &dyn Rule,
    subject: &SubjectIdentity,
    request: &PrivilegeRequest,
) -> Isolated {
    match catch_unwind(AssertUnwindSafe(|| rule.evaluate(subject, request))) {
        Ok(Ok(decision)) => Isolated {
            decision,
            faulted: false,
        },
        Ok(Err(e)) => {
            warn!(rule = %rule.name(), subject = %subject, request = %request, error = %e, "Rule evaluation failed, abstaining");
            Isolated {
                decision: RuleDecision::Abstain,
                faulted: true,
            }
        }
        Err(panic) => {
            warn!(
                rule = %rule.name(),
                subject = %subject,
                request = %request,
                panic = %panic_message(panic.as_ref()),
                "Rule evaluation panicked, abstaining"
            );
            Isolated {
                decision: RuleDecision::Abstain,
                faulted: true,
            }
        }
    }
}

/// Whether any condition the rule attaches to the subject is mutable
pub fn has_mutable_condition(rule: &dyn Rule, subject: &SubjectIdentity) -> bool {
    let probe = catch_unwind(AssertUnwindSafe(|| {
        rule.conditions(subject)
            .map(|conditions| conditions.iter().any(|c| c.is_mutable()))
            .unwrap_or(false)
    }));

    match probe {
        Ok(mutable) => mutable,
        Err(panic) => {
            warn!(
                rule = %rule.name(),
                subject = %subject,
                panic = %panic_message(panic.as_ref()),
                "Condition probe panicked, treating as mutable"
            );
            true
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
