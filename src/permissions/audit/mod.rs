/*!
 * Decision Audit Trail
 * Tracks evaluated decisions and denials for security monitoring
 */

use crate::core::limits::{MAX_AUDIT_EVENTS, MAX_AUDIT_EVENTS_PER_SUBJECT};
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use crate::permissions::types::Decision;
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::collections::VecDeque;
use std::time::SystemTime;

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
}

/// One evaluated decision
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub subject: SubjectIdentity,
    pub request: PrivilegeRequest,
    pub decision: Decision,
    /// Policy generation the decision was made against
    pub generation: u64,
    pub severity: AuditSeverity,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl AuditEvent {
    pub fn new(
        subject: SubjectIdentity,
        request: PrivilegeRequest,
        decision: Decision,
        generation: u64,
    ) -> Self {
        let severity = match decision {
            Decision::Granted | Decision::Postponed => AuditSeverity::Info,
            Decision::Denied | Decision::Abstain => AuditSeverity::Warning,
        };

        Self {
            subject,
            request,
            decision,
            generation,
            severity,
            logged_at: SystemTime::now(),
        }
    }

    pub fn is_denial(&self) -> bool {
        self.decision == Decision::Denied
    }
}

/// Audit logger for decisions
pub struct AuditLogger {
    /// Global event log (ring buffer)
    events: parking_lot::RwLock<VecDeque<AuditEvent>>,
    /// Per-subject event logs
    subject_events: DashMap<SubjectIdentity, VecDeque<AuditEvent>, RandomState>,
    /// Denial counters for monitoring
    denial_counts: DashMap<SubjectIdentity, u64, RandomState>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            events: parking_lot::RwLock::new(VecDeque::with_capacity(MAX_AUDIT_EVENTS)),
            subject_events: DashMap::with_hasher(RandomState::new()),
            denial_counts: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Log a decision
    pub fn log(&self, event: AuditEvent) {
        let subject = event.subject.clone();
        let is_denied = event.is_denial();

        {
            let mut events = self.events.write();
            if events.len() >= MAX_AUDIT_EVENTS {
                events.pop_front();
            }
            events.push_back(event.clone());
        }

        {
            let mut entry = self
                .subject_events
                .entry(subject.clone())
                .or_insert_with(|| VecDeque::with_capacity(MAX_AUDIT_EVENTS_PER_SUBJECT));
            if entry.len() >= MAX_AUDIT_EVENTS_PER_SUBJECT {
                entry.pop_front();
            }
            entry.push_back(event);
        }

        if is_denied {
            self.denial_counts
                .entry(subject)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
    }

    /// Get recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Get events for a specific subject, newest first
    pub fn for_subject(&self, subject: &SubjectIdentity, limit: usize) -> Vec<AuditEvent> {
        self.subject_events
            .get(subject)
            .map(|entry| entry.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn denial_count(&self, subject: &SubjectIdentity) -> u64 {
        self.denial_counts.get(subject).map(|e| *e).unwrap_or(0)
    }

    /// All subjects with denials
    pub fn subjects_with_denials(&self) -> Vec<(SubjectIdentity, u64)> {
        self.denial_counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Export recent events as JSON lines
    pub fn export_json(&self, limit: usize) -> Vec<String> {
        self.recent(limit)
            .iter()
            .filter_map(|event| serde_json::to_string(event).ok())
            .collect()
    }

    pub fn clear_all(&self) {
        self.events.write().clear();
        self.subject_events.clear();
        self.denial_counts.clear();
    }

    pub fn stats(&self) -> AuditStats {
        let total_events = self.events.read().len();
        let total_denials: u64 = self.denial_counts.iter().map(|e| *e.value()).sum();

        AuditStats {
            total_events,
            total_denials,
            subjects_tracked: self.subject_events.len(),
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Audit statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_events: usize,
    pub total_denials: u64,
    pub subjects_tracked: usize,
}
