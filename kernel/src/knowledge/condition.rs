//! Boolean conditions over question values.
//!
//! Evaluation is three-valued: `Ok(true)`, `Ok(false)`, or an
//! [`EvalError`] when a referenced question is unanswered or answered
//! "unknown". Callers that only need a yes/no use [`Condition::is_true`].

use std::collections::BTreeSet;

use thiserror::Error;

use crate::knowledge::terminology::QuestionId;
use crate::knowledge::value::Value;

/// Read access to the current value of each question.
pub trait Answers {
    fn value(&self, question: QuestionId) -> Option<&Value>;
}

impl Answers for std::collections::BTreeMap<QuestionId, Value> {
    fn value(&self, question: QuestionId) -> Option<&Value> {
        self.get(&question)
    }
}

/// Indeterminate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("question {0} has no answer")]
    NoAnswer(QuestionId),
    #[error("question {0} is answered unknown")]
    UnknownAnswer(QuestionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Equal { question: QuestionId, value: Value },
    /// The question has a value other than "unknown".
    Known(QuestionId),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    #[must_use]
    pub fn equal(question: QuestionId, value: Value) -> Self {
        Self::Equal { question, value }
    }

    #[must_use]
    pub fn known(question: QuestionId) -> Self {
        Self::Known(question)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Self::Not(Box::new(inner))
    }

    #[must_use]
    pub fn and(terms: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(terms.into_iter().collect())
    }

    #[must_use]
    pub fn or(terms: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(terms.into_iter().collect())
    }

    /// Evaluates the condition.
    ///
    /// `And` is false as soon as one term is false even if another term is
    /// indeterminate; `Or` is symmetric. Otherwise the first indeterminacy
    /// is reported.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when the outcome depends on an unanswered or
    /// unknown question.
    pub fn eval<A: Answers + ?Sized>(&self, answers: &A) -> Result<bool, EvalError> {
        match self {
            Self::Equal { question, value } => match answers.value(*question) {
                None => Err(EvalError::NoAnswer(*question)),
                Some(Value::Unknown) if !value.is_unknown() => {
                    Err(EvalError::UnknownAnswer(*question))
                }
                Some(actual) => Ok(actual == value),
            },
            Self::Known(question) => match answers.value(*question) {
                None => Err(EvalError::NoAnswer(*question)),
                Some(v) => Ok(!v.is_unknown()),
            },
            Self::Not(inner) => inner.eval(answers).map(|b| !b),
            Self::And(terms) => fold_terms(terms, answers, false),
            Self::Or(terms) => fold_terms(terms, answers, true),
        }
    }

    /// `eval` with indeterminacy mapped to `false`.
    #[must_use]
    pub fn is_true<A: Answers + ?Sized>(&self, answers: &A) -> bool {
        self.eval(answers).unwrap_or(false)
    }

    /// Every question referenced anywhere in the condition.
    #[must_use]
    pub fn terminal_objects(&self) -> BTreeSet<QuestionId> {
        let mut out = BTreeSet::new();
        self.collect_terminals(&mut out);
        out
    }

    fn collect_terminals(&self, out: &mut BTreeSet<QuestionId>) {
        match self {
            Self::Equal { question, .. } | Self::Known(question) => {
                out.insert(*question);
            }
            Self::Not(inner) => inner.collect_terminals(out),
            Self::And(terms) | Self::Or(terms) => {
                for term in terms {
                    term.collect_terminals(out);
                }
            }
        }
    }
}

// `short_circuit` is the value that decides the junction on its own:
// `false` for And, `true` for Or.
fn fold_terms<A: Answers + ?Sized>(
    terms: &[Condition],
    answers: &A,
    short_circuit: bool,
) -> Result<bool, EvalError> {
    let mut first_error = None;
    for term in terms {
        match term.eval(answers) {
            Ok(b) if b == short_circuit => return Ok(short_circuit),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(!short_circuit), Err)
}
