/*!
 * Decision Types
 * Four-valued decisions and per-rule results
 */

use super::traits::Condition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Combined or per-rule decision
///
/// Bit values are kept for hosts that expect the flag encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Granted,
    Denied,
    Abstain,
    Postponed,
}

impl Decision {
    pub const GRANTED_BIT: u32 = 0x0001;
    pub const DENIED_BIT: u32 = 0x0002;
    pub const ABSTAIN_BIT: u32 = 0x0004;
    pub const POSTPONED_BIT: u32 = 0x0008;

    /// Flag encoding of this decision
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Decision::Granted => Self::GRANTED_BIT,
            Decision::Denied => Self::DENIED_BIT,
            Decision::Abstain => Self::ABSTAIN_BIT,
            Decision::Postponed => Self::POSTPONED_BIT,
        }
    }

    /// Decode a flag value
    ///
    /// A postponed flag may carry its intended grant/deny bit alongside.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & Self::POSTPONED_BIT != 0 {
            return Some(Decision::Postponed);
        }
        match bits {
            Self::GRANTED_BIT => Some(Decision::Granted),
            Self::DENIED_BIT => Some(Decision::Denied),
            Self::ABSTAIN_BIT => Some(Decision::Abstain),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_granted(self) -> bool {
        self.bits() & Self::GRANTED_BIT != 0
    }

    /// Granted or denied
    #[inline]
    pub const fn is_final(self) -> bool {
        matches!(self, Decision::Granted | Decision::Denied)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Granted => "GRANTED",
            Decision::Denied => "DENIED",
            Decision::Abstain => "ABSTAIN",
            Decision::Postponed => "POSTPONED",
        };
        f.write_str(s)
    }
}

/// Intended result of a postponed rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Grant,
    Deny,
}

impl Outcome {
    #[inline]
    pub const fn decision(self) -> Decision {
        match self {
            Outcome::Grant => Decision::Granted,
            Outcome::Deny => Decision::Denied,
        }
    }
}

/// A rule decision that depends on conditions forced at operation time
#[derive(Debug, Clone)]
pub struct PostponedDecision {
    /// Name of the rule that postponed
    pub rule: String,
    /// Decision the rule yields once its conditions hold
    pub outcome: Outcome,
    /// Conditions to force when the real operation executes
    pub conditions: Vec<Arc<dyn Condition>>,
}

/// Result of evaluating one rule
#[derive(Debug, Clone)]
pub enum RuleDecision {
    Granted,
    Denied,
    Abstain,
    Postponed(PostponedDecision),
}

impl RuleDecision {
    pub fn postponed(
        rule: impl Into<String>,
        outcome: Outcome,
        conditions: Vec<Arc<dyn Condition>>,
    ) -> Self {
        RuleDecision::Postponed(PostponedDecision {
            rule: rule.into(),
            outcome,
            conditions,
        })
    }

    #[inline]
    pub fn decision(&self) -> Decision {
        match self {
            RuleDecision::Granted => Decision::Granted,
            RuleDecision::Denied => Decision::Denied,
            RuleDecision::Abstain => Decision::Abstain,
            RuleDecision::Postponed(_) => Decision::Postponed,
        }
    }

    /// Flag encoding; a postponed entry also carries its outcome bit
    pub fn bits(&self) -> u32 {
        match self {
            RuleDecision::Postponed(p) => Decision::POSTPONED_BIT | p.outcome.decision().bits(),
            other => other.decision().bits(),
        }
    }

    pub fn is_abstain(&self) -> bool {
        matches!(self, RuleDecision::Abstain)
    }
}

impl From<Decision> for RuleDecision {
    /// Immediate decisions only; a bare `Postponed` carries no outcome and
    /// maps to `Abstain`.
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Granted => RuleDecision::Granted,
            Decision::Denied => RuleDecision::Denied,
            Decision::Abstain | Decision::Postponed => RuleDecision::Abstain,
        }
    }
}
