/*!
 * Decision Table
 * One immutable policy snapshot paired with its private decision cache
 *
 * The cache is born and dies with the table: replacing the policy means
 * building a new table, never mutating this one.
 */

use super::cache::{CacheKey, CacheStats, CachedValue, DecisionCache};
use super::policy::{has_mutable_condition, Combination, DecisionCombiner};
use super::types::{
    Decision, DecisionSource, DeferredCheckHost, DeferredCheckSink, FixedSinkHost,
    NoDeferredChecks, Rule,
};
use crate::core::config::PolicyConfig;
use crate::core::errors::{PolicyError, PolicyResult};
use crate::core::limits::{DEFAULT_DECISION_CACHE_CAPACITY, MIN_DECISION_CACHE_CAPACITY};
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

#[derive(Default)]
struct TableCounters {
    evaluations: AtomicU64,
    rule_faults: AtomicU64,
    deferred: AtomicU64,
    missing_sink_faults: AtomicU64,
}

/// Evaluation statistics for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub evaluations: u64,
    pub rule_faults: u64,
    pub deferred: u64,
    /// Deferrals the host could not accept; an integration fault
    pub missing_sink_faults: u64,
}

pub struct DecisionTable {
    rules: Vec<Arc<dyn Rule>>,
    cache: DecisionCache,
    combiner: DecisionCombiner,
    counters: TableCounters,
}

impl DecisionTable {
    /// Table over `rules` without deferred check support
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self::assemble(
            rules,
            Arc::new(NoDeferredChecks),
            DEFAULT_DECISION_CACHE_CAPACITY,
        )
    }

    pub fn builder() -> DecisionTableBuilder {
        DecisionTableBuilder::default()
    }

    fn assemble(
        rules: Vec<Arc<dyn Rule>>,
        host: Arc<dyn DeferredCheckHost>,
        cache_capacity: usize,
    ) -> Self {
        debug!(rules = rules.len(), cache_capacity, "Building decision table");
        Self {
            rules,
            cache: DecisionCache::new(cache_capacity),
            combiner: DecisionCombiner::new(host),
            counters: TableCounters::default(),
        }
    }

    /// Evaluate a privilege request for a subject
    #[instrument(level = "trace", skip_all, fields(subject = %subject, request = %request))]
    pub fn evaluate(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> Decision {
        self.counters.evaluations.fetch_add(1, Ordering::Relaxed);

        let key = CacheKey::new(subject, request);
        let mut volatile = match self.cache.get(&key) {
            CachedValue::Resolved(decision) => {
                trace!(%decision, "Cache hit");
                return decision;
            }
            CachedValue::Volatile => true,
            CachedValue::Unset => false,
        };

        if self.rules.is_empty() {
            self.cache.put(key, Decision::Abstain);
            return Decision::Abstain;
        }

        // Mutability is static per rule and subject, so only a first
        // encounter needs the probe.
        let probe = !volatile;
        let cache = &self.cache;
        let combination = self.combiner.combine(subject, request, &self.rules, |rule| {
            if probe && !volatile && has_mutable_condition(rule, subject) {
                trace!(rule = %rule.name(), "Mutable condition, key is volatile");
                volatile = true;
                cache.mark_volatile(key.clone());
            }
        });

        self.record(&combination);
        if !volatile && combination.is_cacheable() {
            self.cache.put(key, combination.decision);
        }
        combination.decision
    }

    fn record(&self, combination: &Combination) {
        if combination.rule_faults > 0 {
            self.counters
                .rule_faults
                .fetch_add(combination.rule_faults as u64, Ordering::Relaxed);
        }
        if combination.deferred {
            self.counters.deferred.fetch_add(1, Ordering::Relaxed);
        }
        if combination.missing_sink {
            self.counters
                .missing_sink_faults
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Bind a subject for `implies` checks
    pub fn scope<'a>(&'a self, subject: &'a SubjectIdentity) -> SubjectScope<'a> {
        SubjectScope {
            table: self,
            subject,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, index: usize) -> Option<&Arc<dyn Rule>> {
        self.rules.get(index)
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.iter().find(|rule| rule.name() == name)
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Each rule's own serialized form, in order
    pub fn encoded_rules(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.encoded()).collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            evaluations: self.counters.evaluations.load(Ordering::Relaxed),
            rule_faults: self.counters.rule_faults.load(Ordering::Relaxed),
            deferred: self.counters.deferred.load(Ordering::Relaxed),
            missing_sink_faults: self.counters.missing_sink_faults.load(Ordering::Relaxed),
        }
    }
}

impl DecisionSource for DecisionTable {
    fn evaluate(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> Decision {
        DecisionTable::evaluate(self, subject, request)
    }
}

impl fmt::Debug for DecisionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionTable")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Table bound to the subject on whose behalf checks are made
#[derive(Clone, Copy)]
pub struct SubjectScope<'a> {
    table: &'a DecisionTable,
    subject: &'a SubjectIdentity,
}

impl<'a> SubjectScope<'a> {
    pub fn subject(&self) -> &SubjectIdentity {
        self.subject
    }

    pub fn evaluate(&self, request: &PrivilegeRequest) -> Decision {
        self.table.evaluate(self.subject, request)
    }

    /// True iff the evaluated decision carries the GRANTED bit
    pub fn implies(&self, request: &PrivilegeRequest) -> bool {
        self.evaluate(request).is_granted()
    }
}

/// Builder for decision tables
///
/// A table needs an explicit rule set; an empty one is valid.
pub struct DecisionTableBuilder {
    rules: Option<Vec<Arc<dyn Rule>>>,
    host: Arc<dyn DeferredCheckHost>,
    cache_capacity: usize,
}

impl Default for DecisionTableBuilder {
    fn default() -> Self {
        Self {
            rules: None,
            host: Arc::new(NoDeferredChecks),
            cache_capacity: DEFAULT_DECISION_CACHE_CAPACITY,
        }
    }
}

impl DecisionTableBuilder {
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Self {
        self.rules = Some(rules.into_iter().collect());
        self
    }

    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.get_or_insert_with(Vec::new).push(rule);
        self
    }

    pub fn with_deferred_host(mut self, host: Arc<dyn DeferredCheckHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_deferred_sink(self, sink: Arc<dyn DeferredCheckSink>) -> Self {
        self.with_deferred_host(Arc::new(FixedSinkHost(sink)))
    }

    /// Capacity below `MIN_DECISION_CACHE_CAPACITY` is raised to it
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(MIN_DECISION_CACHE_CAPACITY);
        self
    }

    pub fn with_config(self, config: &PolicyConfig) -> Self {
        self.with_cache_capacity(config.cache_capacity)
    }

    pub fn build(self) -> PolicyResult<DecisionTable> {
        let rules = self.rules.ok_or(PolicyError::RulesMissing)?;
        Ok(DecisionTable::assemble(rules, self.host, self.cache_capacity))
    }
}
