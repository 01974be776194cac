//! Identifiers, questions and test steps.

use std::fmt;

use crate::knowledge::condition::Condition;
use crate::knowledge::value::Value;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a question in its knowledge base.
    QuestionId,
    "q"
);
define_id!(
    /// Index of a test step ("QContainer") in its knowledge base.
    TestStepId,
    "ts"
);
define_id!(
    /// Identifier of a diagnostic solution, as reported by strategic supports.
    SolutionId,
    "s"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Choice { choices: Vec<String> },
    /// A choice question without alternatives, used for "ok" confirmations.
    ZeroChoice,
    Numeric,
    Text,
}

/// A question of the knowledge base.
///
/// Final ("check-once") questions may only be changed by permanently
/// relevant state transitions; other sources never override their value.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub(crate) id: QuestionId,
    name: String,
    kind: QuestionKind,
    final_question: bool,
    init_value: Option<Value>,
    normal_value: Option<Value>,
}

impl Question {
    fn with_kind(name: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: QuestionId(u32::MAX),
            name: name.into(),
            kind,
            final_question: false,
            init_value: None,
            normal_value: None,
        }
    }

    #[must_use]
    pub fn choice<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::with_kind(name, QuestionKind::Choice { choices })
    }

    #[must_use]
    pub fn zero_choice(name: impl Into<String>) -> Self {
        Self::with_kind(name, QuestionKind::ZeroChoice)
    }

    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Self::with_kind(name, QuestionKind::Numeric)
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::with_kind(name, QuestionKind::Text)
    }

    /// Marks the question as final (check-once).
    #[must_use]
    pub fn final_question(mut self) -> Self {
        self.final_question = true;
        self
    }

    #[must_use]
    pub fn with_init_value(mut self, value: Value) -> Self {
        self.init_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_normal_value(mut self, value: Value) -> Self {
        self.normal_value = Some(value);
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        self.final_question
    }

    #[must_use]
    pub fn init_value(&self) -> Option<&Value> {
        self.init_value.as_ref()
    }

    /// The value a question is expected to take when its test step is
    /// performed during search.
    ///
    /// An explicit normal value wins; otherwise the first choice, an empty
    /// text, or "unknown" for zero-choice questions. Numeric questions
    /// without a normal value have no expectation.
    #[must_use]
    pub fn expected_value(&self) -> Option<Value> {
        if let Some(v) = &self.normal_value {
            return Some(v.clone());
        }
        match &self.kind {
            QuestionKind::Choice { choices } => choices.first().map(Value::choice),
            QuestionKind::ZeroChoice => Some(Value::Unknown),
            QuestionKind::Text => Some(Value::text("")),
            QuestionKind::Numeric => None,
        }
    }

    /// Whether the answer is a plain confirmation that may be retracted once
    /// the path moves past its test step.
    #[must_use]
    pub fn is_confirmation(&self) -> bool {
        match &self.kind {
            QuestionKind::ZeroChoice => true,
            QuestionKind::Choice { choices } => match choices.as_slice() {
                [only] => {
                    let lower = only.to_ascii_lowercase();
                    lower == "ok" || lower.ends_with("#ok")
                }
                _ => false,
            },
            QuestionKind::Numeric | QuestionKind::Text => false,
        }
    }
}

/// Additional cost of a test step, charged while `condition` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSupplement {
    pub condition: Condition,
    pub amount: f64,
}

/// Marks a test step as a comfort step; the optional condition must hold
/// at the insertion point in addition to the activation condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComfortBenefit {
    pub condition: Option<Condition>,
}

/// A test step ("QContainer"): an executable unit of questions with a cost.
#[derive(Debug, Clone, PartialEq)]
pub struct TestStep {
    pub(crate) id: TestStepId,
    name: String,
    questions: Vec<QuestionId>,
    cost: f64,
    cost_supplements: Vec<CostSupplement>,
    max_supplement: Option<f64>,
    permanently_relevant: bool,
    target_only: bool,
    comfort: Option<ComfortBenefit>,
}

impl TestStep {
    #[must_use]
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            id: TestStepId(u32::MAX),
            name: name.into(),
            questions: Vec::new(),
            cost,
            cost_supplements: Vec::new(),
            max_supplement: None,
            permanently_relevant: false,
            target_only: false,
            comfort: None,
        }
    }

    #[must_use]
    pub fn with_questions(mut self, questions: impl IntoIterator<Item = QuestionId>) -> Self {
        self.questions.extend(questions);
        self
    }

    #[must_use]
    pub fn with_cost_supplement(mut self, condition: Condition, amount: f64) -> Self {
        self.cost_supplements.push(CostSupplement { condition, amount });
        self
    }

    /// Caps the sum of applicable cost supplements.
    #[must_use]
    pub fn with_max_supplement(mut self, max: f64) -> Self {
        self.max_supplement = Some(max);
        self
    }

    #[must_use]
    pub fn permanently_relevant(mut self) -> Self {
        self.permanently_relevant = true;
        self
    }

    /// The step may end a path but is never expanded further during search.
    #[must_use]
    pub fn target_only(mut self) -> Self {
        self.target_only = true;
        self
    }

    #[must_use]
    pub fn comfort(mut self, condition: Option<Condition>) -> Self {
        self.comfort = Some(ComfortBenefit { condition });
        self
    }

    #[must_use]
    pub fn id(&self) -> TestStepId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionId] {
        &self.questions
    }

    /// Static cost.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[must_use]
    pub fn cost_supplements(&self) -> &[CostSupplement] {
        &self.cost_supplements
    }

    #[must_use]
    pub fn max_supplement(&self) -> Option<f64> {
        self.max_supplement
    }

    #[must_use]
    pub fn is_permanently_relevant(&self) -> bool {
        self.permanently_relevant
    }

    #[must_use]
    pub fn is_target_only(&self) -> bool {
        self.target_only
    }

    #[must_use]
    pub fn comfort_benefit(&self) -> Option<&ComfortBenefit> {
        self.comfort.as_ref()
    }
}
