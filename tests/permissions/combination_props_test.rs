/*!
 * Property tests for rule combination
 */

use super::common::{billing, decision_of, FixedRule, RuleBehavior};
use ai_os_permadmin::permissions::{DecisionTable, DeferredCheckQueue};
use ai_os_permadmin::{Decision, Outcome, PrivilegeRequest, Rule};
use proptest::prelude::*;
use std::sync::Arc;

fn immediate_behavior() -> impl Strategy<Value = RuleBehavior> {
    prop_oneof![
        Just(RuleBehavior::Decide(Decision::Granted)),
        Just(RuleBehavior::Decide(Decision::Denied)),
        Just(RuleBehavior::Decide(Decision::Abstain)),
        Just(RuleBehavior::Fail),
    ]
}

fn decide(outcome: Outcome) -> RuleBehavior {
    RuleBehavior::Decide(outcome.decision())
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Grant), Just(Outcome::Deny)]
}

fn table_of(behaviors: &[RuleBehavior], queue: Option<&Arc<DeferredCheckQueue>>) -> DecisionTable {
    let rules: Vec<Arc<dyn Rule>> = behaviors
        .iter()
        .enumerate()
        .map(|(idx, behavior)| FixedRule::new(&format!("rule-{idx}"), *behavior).shared() as Arc<dyn Rule>)
        .collect();
    let mut builder = DecisionTable::builder().with_rules(rules);
    if let Some(queue) = queue {
        builder = builder.with_deferred_host(Arc::new(Arc::clone(queue)));
    }
    builder.build().unwrap()
}

fn request() -> PrivilegeRequest {
    PrivilegeRequest::file("/srv/reports", "read")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn first_decisive_rule_wins(behaviors in prop::collection::vec(immediate_behavior(), 0..8)) {
        let expected = behaviors
            .iter()
            .map(|behavior| decision_of(*behavior))
            .find(|decision| *decision != Decision::Abstain)
            .unwrap_or(Decision::Abstain);

        let table = table_of(&behaviors, None);
        prop_assert_eq!(table.evaluate(&billing(), &request()), expected);
        // Cached answer agrees
        prop_assert_eq!(table.evaluate(&billing(), &request()), expected);
    }

    #[test]
    fn agreeing_postponements_are_absorbed(
        postponed in 1usize..5,
        outcome in outcome(),
        tail in prop::collection::vec(immediate_behavior(), 0..4),
    ) {
        let mut behaviors = vec![RuleBehavior::Postpone(outcome); postponed];
        behaviors.push(decide(outcome));
        behaviors.extend(tail);

        let queue = DeferredCheckQueue::new();
        let table = table_of(&behaviors, Some(&queue));

        prop_assert_eq!(table.evaluate(&billing(), &request()), outcome.decision());
        prop_assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn any_conflict_defers(
        agreeing in 0usize..4,
        outcome in outcome(),
    ) {
        let opposite = match outcome {
            Outcome::Grant => Outcome::Deny,
            Outcome::Deny => Outcome::Grant,
        };
        let mut behaviors = vec![RuleBehavior::Postpone(opposite)];
        behaviors.extend(std::iter::repeat(RuleBehavior::Postpone(outcome)).take(agreeing));
        behaviors.push(decide(outcome));

        let queue = DeferredCheckQueue::new();
        let table = table_of(&behaviors, Some(&queue));

        prop_assert_eq!(table.evaluate(&billing(), &request()), Decision::Postponed);
        prop_assert_eq!(queue.pending_len(), 1);
        prop_assert_eq!(table.cache_stats().size, 0);
    }

    #[test]
    fn swapping_opposed_rules_flips_result(padding in 0usize..4) {
        let abstain = RuleBehavior::Decide(Decision::Abstain);
        let mut grant_first = vec![abstain; padding];
        grant_first.extend([decide(Outcome::Grant), decide(Outcome::Deny)]);
        let mut deny_first = vec![abstain; padding];
        deny_first.extend([decide(Outcome::Deny), decide(Outcome::Grant)]);

        prop_assert_eq!(
            table_of(&grant_first, None).evaluate(&billing(), &request()),
            Decision::Granted
        );
        prop_assert_eq!(
            table_of(&deny_first, None).evaluate(&billing(), &request()),
            Decision::Denied
        );
    }
}
