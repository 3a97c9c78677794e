/*!
 * Deferred Check Queue
 * In-process sink for postponed decisions
 *
 * Checks are filed under the (subject, request) that registered them. The
 * caller that got POSTPONED runs the real operation and then calls
 * `resolve_for` with the same pair, which forces every postponed condition
 * to a concrete value for that caller only.
 *
 * The queue is bounded in total and per request; see `core::limits`. Both
 * bounds are soft under concurrent registration.
 */

use super::cache::CacheKey;
use super::types::{
    Decision, DeferredCheck, DeferredCheckHost, DeferredCheckSink, RuleDecision,
};
use crate::core::limits::{MAX_PENDING_CHECKS_PER_REQUEST, MAX_PENDING_DEFERRED_CHECKS};
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A registered check awaiting resolution
#[derive(Debug, Clone)]
pub struct PendingCheck {
    pub id: Uuid,
    seq: u64,
    pub check: DeferredCheck,
}

/// Check together with its final decision
#[derive(Debug, Clone)]
pub struct ResolvedCheck {
    pub id: Uuid,
    pub check: DeferredCheck,
    pub decision: Decision,
}

/// Queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredStats {
    pub pending: usize,
    pub registered: u64,
    pub resolved: u64,
    /// Checks rejected at the queue bound or superseded per request
    pub dropped: u64,
}

pub struct DeferredCheckQueue {
    pending: DashMap<CacheKey, Vec<PendingCheck>, RandomState>,
    len: AtomicUsize,
    max_pending: usize,
    max_per_request: usize,
    seq: AtomicU64,
    registered: AtomicU64,
    resolved: AtomicU64,
    dropped: AtomicU64,
}

impl DeferredCheckQueue {
    pub fn new() -> Arc<Self> {
        Self::with_limits(MAX_PENDING_DEFERRED_CHECKS, MAX_PENDING_CHECKS_PER_REQUEST)
    }

    pub fn with_limits(max_pending: usize, max_per_request: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::with_hasher(RandomState::new()),
            len: AtomicUsize::new(0),
            max_pending: max_pending.max(1),
            max_per_request: max_per_request.max(1),
            seq: AtomicU64::new(0),
            registered: AtomicU64::new(0),
            resolved: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn pending_len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Unresolved checks registered for this subject and request
    pub fn pending_for(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> usize {
        self.pending
            .get(&CacheKey::new(subject, request))
            .map(|checks| checks.len())
            .unwrap_or(0)
    }

    /// Resolve and remove the checks registered by one caller
    ///
    /// Checks filed under any other (subject, request) are left pending.
    pub fn resolve_for(
        &self,
        subject: &SubjectIdentity,
        request: &PrivilegeRequest,
    ) -> Vec<ResolvedCheck> {
        match self.pending.remove(&CacheKey::new(subject, request)) {
            Some((_, checks)) => self.finish(checks),
            None => Vec::new(),
        }
    }

    /// Resolve and drain every pending check, in registration order
    pub fn resolve_pending(&self) -> Vec<ResolvedCheck> {
        let keys: Vec<CacheKey> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        let mut drained: Vec<PendingCheck> = keys
            .iter()
            .filter_map(|key| self.pending.remove(key))
            .flat_map(|(_, checks)| checks)
            .collect();
        drained.sort_by_key(|pending| pending.seq);
        self.finish(drained)
    }

    fn finish(&self, checks: Vec<PendingCheck>) -> Vec<ResolvedCheck> {
        self.len.fetch_sub(checks.len(), Ordering::Relaxed);
        self.resolved
            .fetch_add(checks.len() as u64, Ordering::Relaxed);

        checks
            .into_iter()
            .map(|pending| {
                let decision = resolve(&pending.check);
                debug!(id = %pending.id, subject = %pending.check.subject, %decision, "Deferred check resolved");
                ResolvedCheck {
                    id: pending.id,
                    check: pending.check,
                    decision,
                }
            })
            .collect()
    }

    pub fn stats(&self) -> DeferredStats {
        DeferredStats {
            pending: self.pending_len(),
            registered: self.registered.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl DeferredCheckSink for DeferredCheckQueue {
    fn register_postponed(&self, check: DeferredCheck) {
        let id = Uuid::new_v4();
        self.registered.fetch_add(1, Ordering::Relaxed);

        let key = CacheKey::new(&check.subject, &check.request);

        // A full request slot supersedes in place, so only growth is refused
        if self.len.load(Ordering::Relaxed) >= self.max_pending
            && self
                .pending
                .get(&key)
                .map_or(true, |checks| checks.len() < self.max_per_request)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                %id,
                subject = %check.subject,
                request = %check.request,
                limit = self.max_pending,
                "Deferred check queue full, dropping check"
            );
            return;
        }

        let mut checks = self.pending.entry(key).or_default();
        if checks.len() >= self.max_per_request {
            let superseded = checks.remove(0);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(id = %superseded.id, subject = %check.subject, "Superseded oldest deferred check");
        } else {
            self.len.fetch_add(1, Ordering::Relaxed);
        }

        debug!(%id, subject = %check.subject, request = %check.request, "Deferred check registered");
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        checks.push(PendingCheck { id, seq, check });
    }
}

impl DeferredCheckHost for Arc<DeferredCheckQueue> {
    fn deferred_sink(&self) -> Option<Arc<dyn DeferredCheckSink>> {
        Some(Arc::clone(self) as Arc<dyn DeferredCheckSink>)
    }
}

/// Resolve one check at operation time
///
/// Rule order still decides: an immediate GRANTED/DENIED wins, a postponed
/// entry whose conditions all hold yields its outcome, anything else
/// abstains. With nothing decisive the check is denied.
pub fn resolve(check: &DeferredCheck) -> Decision {
    for entry in &check.decisions {
        match entry {
            RuleDecision::Granted => return Decision::Granted,
            RuleDecision::Denied => return Decision::Denied,
            RuleDecision::Abstain => continue,
            RuleDecision::Postponed(p) => {
                if p.conditions
                    .iter()
                    .all(|c| c.is_satisfied(&check.subject))
                {
                    return p.outcome.decision();
                }
            }
        }
    }
    Decision::Denied
}
