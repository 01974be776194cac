//! Facts: values with provenance and a global sequence number.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::knowledge::state_transition::ConditionalValueSetter;
use crate::knowledge::terminology::{QuestionId, TestStepId};
use crate::knowledge::value::Value;

static FACT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Next value of the process-wide fact sequence. Strictly increasing.
#[must_use]
pub fn next_sequence() -> u64 {
    FACT_SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactSource {
    /// Initial value from the knowledge base.
    Init,
    User,
    /// Expected value assumed while exploring a session copy.
    Search,
    Transition {
        step: TestStepId,
        setter: ConditionalValueSetter,
        /// The fact stems from a permanently relevant step.
        permanently_relevant: bool,
    },
}

impl FactSource {
    #[must_use]
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }

    #[must_use]
    pub fn is_permanently_relevant_transition(&self) -> bool {
        matches!(
            self,
            Self::Transition {
                permanently_relevant: true,
                ..
            }
        )
    }

    /// Two sources occupy the same blackboard slot: a newer fact from the same
    /// slot replaces the older one.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Transition { step: a, .. }, Self::Transition { step: b, .. }) => a == b,
            (Self::Init, Self::Init) | (Self::User, Self::User) | (Self::Search, Self::Search) => {
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    question: QuestionId,
    value: Value,
    source: FactSource,
    sequence: u64,
}

impl Fact {
    /// Creates a fact stamped with the next global sequence number.
    #[must_use]
    pub fn new(question: QuestionId, value: Value, source: FactSource) -> Self {
        Self {
            question,
            value,
            source,
            sequence: next_sequence(),
        }
    }

    #[must_use]
    pub fn question(&self) -> QuestionId {
        self.question
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn source(&self) -> &FactSource {
        &self.source
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
