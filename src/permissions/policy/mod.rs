/*!
 * Policy Module
 * Decision combination and rule isolation
 */

mod engine;
mod isolation;


pub use engine::{Combination, DecisionCombiner};
pub use isolation::{evaluate_isolated, has_mutable_condition, Isolated};
