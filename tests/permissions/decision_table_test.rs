/*!
 * Decision Table Integration Tests
 */

use super::common::{
    billing, deny, grant, rules, FixedRule, RuleBehavior, StaticCondition,
};
use ai_os_permadmin::permissions::{DecisionTable, DeferredCheckQueue};
use ai_os_permadmin::{Decision, Outcome, PolicyError, PrivilegeRequest, SubjectIdentity};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn read() -> PrivilegeRequest {
    PrivilegeRequest::file("/var/billing/ledger", "read")
}

#[test]
fn test_empty_table_abstains_and_caches() {
    let table = DecisionTable::builder().with_rules(Vec::new()).build().unwrap();

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Abstain);
    assert_eq!(table.evaluate(&billing(), &read()), Decision::Abstain);

    let stats = table.cache_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_missing_rule_set_fails_at_build() {
    let err = DecisionTable::builder()
        .with_cache_capacity(64)
        .build()
        .unwrap_err();
    assert_eq!(err, PolicyError::RulesMissing);
}

#[test]
fn test_granted_decision_is_cached() {
    let grant = FixedRule::new("grant-ledger", RuleBehavior::Decide(Decision::Granted))
        .with_condition(StaticCondition::immutable("signed-by-acme", true))
        .shared();
    let table = DecisionTable::new(rules([grant.clone()]));

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Granted);
    assert_eq!(table.evaluate(&billing(), &read()), Decision::Granted);

    assert_eq!(grant.calls(), 1, "second request must be a cache hit");
}

#[test]
fn test_conflicting_postponement_is_deferred() {
    let queue = DeferredCheckQueue::new();
    let business_hours = StaticCondition::mutable("business-hours", true);
    let postpone = FixedRule::new("hours", RuleBehavior::Postpone(Outcome::Grant))
        .with_condition(business_hours.clone())
        .shared();

    let table = DecisionTable::builder()
        .with_rules(rules([postpone, deny("deny-all")]))
        .with_deferred_host(Arc::new(queue.clone()))
        .build()
        .unwrap();

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Postponed);
    assert_eq!(queue.pending_for(&billing(), &read()), 1);

    let resolved = queue.resolve_for(&billing(), &read());
    let check = &resolved[0].check;
    assert_eq!(check.subject, billing());
    assert_eq!(check.decisions.len(), 2);
    assert_eq!(check.decisions[0].decision(), Decision::Postponed);
    assert_eq!(check.decisions[1].decision(), Decision::Denied);
    assert_eq!(resolved[0].decision, Decision::Granted);
}

#[test]
fn test_deferred_resolution_sees_condition_at_operation_time() {
    let queue = DeferredCheckQueue::new();
    let business_hours = StaticCondition::mutable("business-hours", true);
    let table = DecisionTable::builder()
        .with_rules(rules([
            FixedRule::new("hours", RuleBehavior::Postpone(Outcome::Grant))
                .with_condition(business_hours.clone())
                .shared(),
            deny("deny-all"),
        ]))
        .with_deferred_host(Arc::new(queue.clone()))
        .build()
        .unwrap();

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Postponed);
    business_hours.set_satisfied(false);

    let resolved = queue.resolve_for(&billing(), &read());
    assert_eq!(resolved[0].decision, Decision::Denied);
}

#[test]
fn test_each_caller_resolves_only_its_own_check() {
    let queue = DeferredCheckQueue::new();
    let business_hours = StaticCondition::mutable("business-hours", true);
    let table = DecisionTable::builder()
        .with_rules(rules([
            FixedRule::new("hours", RuleBehavior::Postpone(Outcome::Grant))
                .with_condition(business_hours)
                .shared(),
            deny("deny-all"),
        ]))
        .with_deferred_host(Arc::new(queue.clone()))
        .build()
        .unwrap();
    let reports = SubjectIdentity::parse("org.acme.reports", "1.4.0").unwrap();

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Postponed);
    assert_eq!(table.evaluate(&reports, &read()), Decision::Postponed);

    let mine = queue.resolve_for(&billing(), &read());
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].check.subject, billing());
    assert_eq!(queue.pending_for(&reports, &read()), 1);

    let theirs = queue.resolve_for(&reports, &read());
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].check.subject, reports);
    assert_eq!(queue.pending_len(), 0);
}

#[test]
fn test_repeated_postponements_do_not_grow_queue_without_bound() {
    let queue = DeferredCheckQueue::new();
    let table = DecisionTable::builder()
        .with_rules(rules([
            FixedRule::new("hours", RuleBehavior::Postpone(Outcome::Grant))
                .with_condition(StaticCondition::mutable("business-hours", false))
                .shared(),
            deny("deny-all"),
        ]))
        .with_deferred_host(Arc::new(queue.clone()))
        .build()
        .unwrap();

    for _ in 0..1000 {
        assert_eq!(table.evaluate(&billing(), &read()), Decision::Postponed);
    }

    assert_eq!(
        queue.pending_len(),
        ai_os_permadmin::core::limits::MAX_PENDING_CHECKS_PER_REQUEST
    );
    assert_eq!(table.stats().deferred, 1000);
}

#[test]
fn test_agreeing_postponement_is_absorbed_and_cached() {
    let queue = DeferredCheckQueue::new();
    let postpone = FixedRule::new("quota", RuleBehavior::Postpone(Outcome::Deny)).shared();
    let deny = deny("deny-all");
    let table = DecisionTable::builder()
        .with_rules(rules([postpone.clone(), deny.clone()]))
        .with_deferred_host(Arc::new(queue.clone()))
        .build()
        .unwrap();

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Denied);
    assert_eq!(table.evaluate(&billing(), &read()), Decision::Denied);

    assert_eq!(queue.pending_len(), 0);
    assert_eq!(postpone.calls(), 1);
    assert_eq!(deny.calls(), 1);
}

#[test]
fn test_mutable_condition_reevaluates_every_time() {
    let rule = FixedRule::new("office-hours", RuleBehavior::Decide(Decision::Granted))
        .with_condition(StaticCondition::mutable("clock", true))
        .shared();
    let table = DecisionTable::new(rules([rule.clone()]));

    assert_eq!(table.evaluate(&billing(), &read()), Decision::Granted);
    assert_eq!(table.evaluate(&billing(), &read()), Decision::Granted);

    assert_eq!(rule.calls(), 2);
    assert_eq!(table.cache_stats().hits, 0);
}

#[test]
fn test_failing_rule_behaves_as_abstain() {
    for failure in [RuleBehavior::Fail, RuleBehavior::Panic] {
        let failing = DecisionTable::new(rules([
            FixedRule::new("broken", failure).shared(),
            deny("deny-all"),
        ]));
        let abstaining = DecisionTable::new(rules([
            FixedRule::new("quiet", RuleBehavior::Decide(Decision::Abstain)).shared(),
            deny("deny-all"),
        ]));

        assert_eq!(
            failing.evaluate(&billing(), &read()),
            abstaining.evaluate(&billing(), &read())
        );
        assert_eq!(failing.stats().rule_faults, 1);
    }
}

#[test]
fn test_rule_order_is_priority() {
    let grant_first = DecisionTable::new(rules([grant("grant"), deny("deny")]));
    let deny_first = DecisionTable::new(rules([deny("deny"), grant("grant")]));

    assert_eq!(grant_first.evaluate(&billing(), &read()), Decision::Granted);
    assert_eq!(deny_first.evaluate(&billing(), &read()), Decision::Denied);
}

#[test]
fn test_actions_produce_independent_entries() {
    let table = DecisionTable::new(rules([
        FixedRule::new("read-only", RuleBehavior::Decide(Decision::Granted))
            .only_actions("read")
            .shared(),
        deny("deny-all"),
    ]));

    let write = PrivilegeRequest::file("/var/billing/ledger", "read,write");
    assert_eq!(table.evaluate(&billing(), &read()), Decision::Granted);
    assert_eq!(table.evaluate(&billing(), &write), Decision::Denied);
    assert_eq!(table.cache_stats().size, 2);
}

#[test]
fn test_subject_version_is_part_of_key() {
    let rule = grant("grant");
    let table = DecisionTable::new(rules([rule.clone()]));
    let next = SubjectIdentity::parse("org.acme.billing", "2.1.1").unwrap();

    table.evaluate(&billing(), &read());
    table.evaluate(&next, &read());

    assert_eq!(rule.calls(), 2);
}

#[test]
fn test_scope_implies_only_on_grant() {
    let table = DecisionTable::new(rules([
        FixedRule::new("read-only", RuleBehavior::Decide(Decision::Granted))
            .only_actions("read")
            .shared(),
    ]));
    let subject = billing();
    let scope = table.scope(&subject);

    assert!(scope.implies(&read()));
    assert!(!scope.implies(&PrivilegeRequest::file("/var/billing/ledger", "write")));
}

#[test]
fn test_encoded_rules_in_order() {
    let table = DecisionTable::new(rules([grant("first"), deny("second")]));

    assert_eq!(
        table.encoded_rules(),
        vec![
            "first { Decide(Granted) }".to_string(),
            "second { Decide(Denied) }".to_string()
        ]
    );
}
