//! State transitions: the pre/postcondition model of a test step.
//!
//! Firing lives in [`crate::transition`], which needs a session.

use std::collections::BTreeSet;

use crate::knowledge::condition::{Answers, Condition};
use crate::knowledge::terminology::{QuestionId, TestStepId};
use crate::knowledge::value::Value;

/// "Set `answer` if `condition` holds (or unconditionally if absent)."
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionalValueSetter {
    answer: Value,
    condition: Option<Condition>,
}

impl ConditionalValueSetter {
    #[must_use]
    pub fn new(answer: Value, condition: Option<Condition>) -> Self {
        Self { answer, condition }
    }

    #[must_use]
    pub fn always(answer: Value) -> Self {
        Self::new(answer, None)
    }

    #[must_use]
    pub fn answer(&self) -> &Value {
        &self.answer
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    #[must_use]
    pub fn holds<A: Answers + ?Sized>(&self, answers: &A) -> bool {
        self.condition.as_ref().map_or(true, |c| c.is_true(answers))
    }
}

/// Ordered setters for one question; the first one that holds wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTransition {
    question: QuestionId,
    setters: Vec<ConditionalValueSetter>,
}

impl ValueTransition {
    #[must_use]
    pub fn new(question: QuestionId, setters: Vec<ConditionalValueSetter>) -> Self {
        Self { question, setters }
    }

    #[must_use]
    pub fn question(&self) -> QuestionId {
        self.question
    }

    #[must_use]
    pub fn setters(&self) -> &[ConditionalValueSetter] {
        &self.setters
    }

    #[must_use]
    pub fn winning_setter<A: Answers + ?Sized>(
        &self,
        answers: &A,
    ) -> Option<&ConditionalValueSetter> {
        self.setters.iter().find(|s| s.holds(answers))
    }
}

/// Precondition plus value transitions, bound to exactly one test step.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    test_step: TestStepId,
    activation_condition: Option<Condition>,
    post_transitions: Vec<ValueTransition>,
}

impl StateTransition {
    #[must_use]
    pub fn new(
        test_step: TestStepId,
        activation_condition: Option<Condition>,
        post_transitions: Vec<ValueTransition>,
    ) -> Self {
        Self {
            test_step,
            activation_condition,
            post_transitions,
        }
    }

    #[must_use]
    pub fn test_step(&self) -> TestStepId {
        self.test_step
    }

    #[must_use]
    pub fn activation_condition(&self) -> Option<&Condition> {
        self.activation_condition.as_ref()
    }

    #[must_use]
    pub fn post_transitions(&self) -> &[ValueTransition] {
        &self.post_transitions
    }

    /// No activation condition means always applicable.
    #[must_use]
    pub fn is_applicable<A: Answers + ?Sized>(&self, answers: &A) -> bool {
        self.activation_condition
            .as_ref()
            .map_or(true, |c| c.is_true(answers))
    }

    /// Questions written by any value transition.
    #[must_use]
    pub fn assigned_questions(&self) -> BTreeSet<QuestionId> {
        self.post_transitions.iter().map(ValueTransition::question).collect()
    }

    /// Questions referenced by the activation condition and every setter condition.
    #[must_use]
    pub fn referenced_questions(&self) -> BTreeSet<QuestionId> {
        let mut out = self
            .activation_condition
            .as_ref()
            .map(Condition::terminal_objects)
            .unwrap_or_default();
        for vt in &self.post_transitions {
            for setter in vt.setters() {
                if let Some(c) = setter.condition() {
                    out.extend(c.terminal_objects());
                }
            }
        }
        out
    }
}
