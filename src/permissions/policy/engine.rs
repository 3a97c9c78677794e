/*!
 * Decision Combiner
 * Walks the ordered rule sequence and merges four-valued rule results
 *
 * Rule order is priority order. A GRANTED/DENIED before any postponement
 * is final. Once a rule has postponed, the next GRANTED/DENIED becomes the
 * immediate decision and evaluation stops; earlier postponements that agree
 * with it are absorbed, and any that conflict force the whole check to be
 * deferred to the host.
 */

use super::isolation::evaluate_isolated;
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use crate::permissions::types::{
    Decision, DeferredCheck, DeferredCheckHost, Rule, RuleDecision,
};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Outcome of one combination pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combination {
    pub decision: Decision,
    /// Rules that failed and were treated as abstaining
    pub rule_faults: usize,
    /// Whether a deferred check was registered with the host
    pub deferred: bool,
    /// Whether deferral was needed but the host had no sink
    pub missing_sink: bool,
}

impl Combination {
    fn new(decision: Decision, rule_faults: usize) -> Self {
        Self {
            decision,
            rule_faults,
            deferred: false,
            missing_sink: false,
        }
    }

    /// Whether the decision may be persisted
    ///
    /// A POSTPONED result belongs to the in-flight check that registered it.
    pub fn is_cacheable(&self) -> bool {
        self.decision != Decision::Postponed
    }
}

/// Combines rule results into one authoritative decision
pub struct DecisionCombiner {
    host: Arc<dyn DeferredCheckHost>,
}

impl DecisionCombiner {
    pub fn new(host: Arc<dyn DeferredCheckHost>) -> Self {
        Self { host }
    }

    /// Combine the decisions of `rules` for one request
    ///
    /// `on_reach` is called with each rule before it is evaluated, and only
    /// for rules evaluation actually reaches.
    pub fn combine<F>(
        &self,
        subject: &SubjectIdentity,
        request: &PrivilegeRequest,
        rules: &[Arc<dyn Rule>],
        mut on_reach: F,
    ) -> Combination
    where
        F: FnMut(&dyn Rule),
    {
        let mut results: Vec<RuleDecision> = Vec::with_capacity(rules.len());
        let mut postponed = false;
        let mut immediate: Option<usize> = None;
        let mut faults = 0;

        for rule in rules {
            on_reach(rule.as_ref());

            let isolated = evaluate_isolated(rule.as_ref(), subject, request);
            if isolated.faulted {
                faults += 1;
            }
            let decision = isolated.decision.decision();
            trace!(rule = %rule.name(), %decision, "Rule evaluated");

            match decision {
                Decision::Abstain => results.push(isolated.decision),
                Decision::Postponed => {
                    postponed = true;
                    results.push(isolated.decision);
                }
                Decision::Granted | Decision::Denied if !postponed => {
                    debug!(rule = %rule.name(), %decision, "Rule decided request");
                    return Combination::new(decision, faults);
                }
                Decision::Granted | Decision::Denied => {
                    immediate = Some(results.len());
                    results.push(isolated.decision);
                    break;
                }
            }
        }

        if !postponed {
            return Combination::new(Decision::Abstain, faults);
        }

        let immediate_decision = immediate
            .map(|idx| results[idx].decision())
            .unwrap_or(Decision::Denied);
        let scan_end = immediate.unwrap_or(results.len());

        let mut conflict = false;
        for entry in results[..scan_end].iter_mut().rev() {
            if let RuleDecision::Postponed(p) = entry {
                if p.outcome.decision() == immediate_decision {
                    *entry = RuleDecision::Abstain;
                } else {
                    conflict = true;
                }
            }
        }

        if !conflict {
            debug!(decision = %immediate_decision, "Postponed rules absorbed by immediate decision");
            return Combination::new(immediate_decision, faults);
        }

        match self.host.deferred_sink() {
            Some(sink) => {
                debug!(subject = %subject, request = %request, "Deferring check to operation time");
                sink.register_postponed(DeferredCheck {
                    subject: subject.clone(),
                    request: request.clone(),
                    decisions: results,
                });
                Combination {
                    decision: Decision::Postponed,
                    rule_faults: faults,
                    deferred: true,
                    missing_sink: false,
                }
            }
            None => {
                error!(
                    subject = %subject,
                    request = %request,
                    "Policy requires deferred resolution but the host has no deferred check sink; abstaining"
                );
                Combination {
                    decision: Decision::Abstain,
                    rule_faults: faults,
                    deferred: false,
                    missing_sink: true,
                }
            }
        }
    }
}
