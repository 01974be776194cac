//! Changes recorded during one propagation frame.

use crate::knowledge::terminology::{QuestionId, TestStepId};
use crate::knowledge::value::Value;
use crate::session::indication::Indication;

#[derive(Debug, Clone, PartialEq)]
pub enum PropagationEntry {
    Value {
        question: QuestionId,
        old: Option<Value>,
        new: Option<Value>,
        /// The change was produced by search or planning machinery rather
        /// than by an answer.
        strategic: bool,
    },
    Indication {
        step: TestStepId,
        old: Indication,
        new: Indication,
    },
}

impl PropagationEntry {
    #[must_use]
    pub fn has_changed(&self) -> bool {
        match self {
            Self::Value { old, new, .. } => old != new,
            Self::Indication { old, new, .. } => old != new,
        }
    }

    #[must_use]
    pub fn question(&self) -> Option<QuestionId> {
        match self {
            Self::Value { question, .. } => Some(*question),
            Self::Indication { .. } => None,
        }
    }

    #[must_use]
    pub fn is_strategic(&self) -> bool {
        matches!(self, Self::Value { strategic: true, .. })
    }
}
