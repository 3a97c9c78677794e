/*!
 * Permission Types Module
 * Core types and traits for the decision engine
 */

mod core;
mod traits;

pub use self::core::{Decision, Outcome, PostponedDecision, RuleDecision};
pub use self::traits::{
    Condition, DecisionSource, DeferredCheck, DeferredCheckHost, DeferredCheckSink,
    FixedSinkHost, NoDeferredChecks, Rule,
};
