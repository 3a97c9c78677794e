/*!
 * Policy Checkpoint
 * Owns the current decision table and swaps it on policy commit
 *
 * Readers load the current snapshot lock-free; a commit publishes a new
 * table (and with it a fresh cache) in one atomic pointer swap. Evaluations
 * already running keep the snapshot they loaded.
 */

use crate::core::config::PolicyConfig;
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use crate::monitoring::CheckSpan;
use crate::permissions::audit::{AuditEvent, AuditLogger, AuditStats};
use crate::permissions::cache::CacheStats;
use crate::permissions::table::{DecisionTable, TableStats};
use crate::permissions::types::{Decision, DecisionSource};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One committed policy
#[derive(Debug)]
pub struct PolicySnapshot {
    pub generation: u64,
    pub table: Arc<DecisionTable>,
}

/// Access-control checkpoint for the container
pub struct PolicyCheckpoint {
    current: ArcSwap<PolicySnapshot>,
    audit: Option<Arc<AuditLogger>>,
    config: PolicyConfig,
}

impl PolicyCheckpoint {
    pub fn new(table: DecisionTable) -> Self {
        Self::with_config(table, PolicyConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(table: DecisionTable, config: PolicyConfig) -> Self {
        debug!(audit = config.audit_enabled, "Initializing policy checkpoint");
        let audit = config
            .audit_enabled
            .then(|| Arc::new(AuditLogger::new()));
        Self {
            current: ArcSwap::from_pointee(PolicySnapshot {
                generation: 1,
                table: Arc::new(table),
            }),
            audit,
            config,
        }
    }

    /// Attach a shared audit logger
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Current decision table
    pub fn table(&self) -> Arc<DecisionTable> {
        Arc::clone(&self.current.load().table)
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Publish a new policy, returning the superseded snapshot
    pub fn commit(&self, table: DecisionTable) -> Arc<PolicySnapshot> {
        let table = Arc::new(table);
        let previous = self.current.rcu(|current| PolicySnapshot {
            generation: current.generation + 1,
            table: Arc::clone(&table),
        });
        info!(
            generation = previous.generation + 1,
            rules = table.len(),
            "Policy committed"
        );
        previous
    }

    /// Evaluate inside an `access_check` span carrying a fresh trace id
    pub fn evaluate_traced(
        &self,
        subject: &SubjectIdentity,
        request: &PrivilegeRequest,
    ) -> Decision {
        let mut span = CheckSpan::new(&subject.to_string(), &request.to_string());
        let decision = {
            let _entered = span.enter();
            self.evaluate(subject, request)
        };
        span.record_decision(decision);
        decision
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn audit(&self) -> Option<&AuditLogger> {
        self.audit.as_deref()
    }

    pub fn audit_stats(&self) -> Option<AuditStats> {
        self.audit.as_ref().map(|audit| audit.stats())
    }

    pub fn stats(&self) -> CheckpointStats {
        let snapshot = self.snapshot();
        CheckpointStats {
            generation: snapshot.generation,
            rules: snapshot.table.len(),
            table: snapshot.table.stats(),
            cache: snapshot.table.cache_stats(),
        }
    }
}

impl DecisionSource for PolicyCheckpoint {
    fn evaluate(&self, subject: &SubjectIdentity, request: &PrivilegeRequest) -> Decision {
        let snapshot = self.snapshot();
        let decision = snapshot.table.evaluate(subject, request);

        if let Some(ref audit) = self.audit {
            audit.log(AuditEvent::new(
                subject.clone(),
                request.clone(),
                decision,
                snapshot.generation,
            ));
        }

        decision
    }
}

/// Checkpoint statistics for the current generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointStats {
    pub generation: u64,
    pub rules: usize,
    pub table: TableStats,
    pub cache: CacheStats,
}
