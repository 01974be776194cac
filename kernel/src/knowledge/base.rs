//! The validated knowledge base and its builder.
//!
//! Questions and test steps are allocated sequentially; names are unique per
//! kind. Construction is fail-closed: unknown references or a second state
//! transition for the same test step are rejected with a typed error.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::knowledge::condition::Condition;
use crate::knowledge::state_transition::StateTransition;
use crate::knowledge::terminology::{Question, QuestionId, TestStep, TestStepId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeError {
    #[error("duplicate question name `{name}`")]
    DuplicateQuestionName { name: String },
    #[error("duplicate test step name `{name}`")]
    DuplicateTestStepName { name: String },
    #[error("test step {step} already has a state transition")]
    DuplicateStateTransition { step: TestStepId },
    #[error("unknown question {question} referenced by {context}")]
    UnknownQuestion { question: QuestionId, context: String },
    #[error("unknown test step {step}")]
    UnknownTestStep { step: TestStepId },
    #[error("test step `{name}` has a non-finite cost")]
    NonFiniteCost { name: String },
    #[error("knowledge base exceeds u32 identifiers")]
    CapacityExceeded,
}

/// Accumulates terminology, then validates it in [`KnowledgeBaseBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseBuilder {
    questions: Vec<Question>,
    steps: Vec<TestStep>,
    transitions: BTreeMap<TestStepId, StateTransition>,
    init_steps: Vec<TestStepId>,
    question_names: BTreeMap<String, QuestionId>,
    step_names: BTreeMap<String, TestStepId>,
}

impl KnowledgeBaseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Fails on a duplicate name.
    pub fn add_question(&mut self, mut question: Question) -> Result<QuestionId, KnowledgeError> {
        if self.question_names.contains_key(question.name()) {
            return Err(KnowledgeError::DuplicateQuestionName {
                name: question.name().to_string(),
            });
        }
        let id = QuestionId(
            u32::try_from(self.questions.len()).map_err(|_| KnowledgeError::CapacityExceeded)?,
        );
        question.id = id;
        self.question_names.insert(question.name().to_string(), id);
        self.questions.push(question);
        Ok(id)
    }

    /// # Errors
    ///
    /// Fails on a duplicate name or a non-finite static cost.
    pub fn add_test_step(&mut self, mut step: TestStep) -> Result<TestStepId, KnowledgeError> {
        if self.step_names.contains_key(step.name()) {
            return Err(KnowledgeError::DuplicateTestStepName {
                name: step.name().to_string(),
            });
        }
        if !step.cost().is_finite() {
            return Err(KnowledgeError::NonFiniteCost {
                name: step.name().to_string(),
            });
        }
        let id = TestStepId(
            u32::try_from(self.steps.len()).map_err(|_| KnowledgeError::CapacityExceeded)?,
        );
        step.id = id;
        self.step_names.insert(step.name().to_string(), id);
        self.steps.push(step);
        Ok(id)
    }

    /// Registers the state transition of its test step.
    ///
    /// # Errors
    ///
    /// Fails if the step is unknown or already has a transition.
    pub fn add_state_transition(
        &mut self,
        transition: StateTransition,
    ) -> Result<(), KnowledgeError> {
        let step = transition.test_step();
        if step.0 as usize >= self.steps.len() {
            return Err(KnowledgeError::UnknownTestStep { step });
        }
        if self.transitions.contains_key(&step) {
            return Err(KnowledgeError::DuplicateStateTransition { step });
        }
        self.transitions.insert(step, transition);
        Ok(())
    }

    /// Marks a step as an init step: its transition may fire whenever it is
    /// completed and applicable, regardless of the planned path.
    ///
    /// # Errors
    ///
    /// Fails if the step is unknown.
    pub fn add_init_step(&mut self, step: TestStepId) -> Result<(), KnowledgeError> {
        if step.0 as usize >= self.steps.len() {
            return Err(KnowledgeError::UnknownTestStep { step });
        }
        if !self.init_steps.contains(&step) {
            self.init_steps.push(step);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if any test step, cost supplement or state transition references
    /// a question that was never added.
    pub fn build(self) -> Result<KnowledgeBase, KnowledgeError> {
        let known = |q: QuestionId| (q.0 as usize) < self.questions.len();
        let check = |q: QuestionId, context: &dyn Fn() -> String| {
            if known(q) {
                Ok(())
            } else {
                Err(KnowledgeError::UnknownQuestion {
                    question: q,
                    context: context(),
                })
            }
        };

        let mut parents: BTreeMap<QuestionId, Vec<TestStepId>> = BTreeMap::new();
        for step in &self.steps {
            for &q in step.questions() {
                check(q, &|| format!("test step `{}`", step.name()))?;
                parents.entry(q).or_default().push(step.id());
            }
            for supplement in step.cost_supplements() {
                for q in supplement.condition.terminal_objects() {
                    check(q, &|| format!("cost supplement of `{}`", step.name()))?;
                }
            }
            if let Some(Some(c)) = step.comfort_benefit().map(|c| c.condition.as_ref()) {
                for q in c.terminal_objects() {
                    check(q, &|| format!("comfort condition of `{}`", step.name()))?;
                }
            }
        }
        for (step, transition) in &self.transitions {
            let mut referenced = transition.referenced_questions();
            referenced.extend(transition.assigned_questions());
            for q in referenced {
                check(q, &|| format!("state transition of {step}"))?;
            }
        }

        Ok(KnowledgeBase {
            questions: self.questions,
            steps: self.steps,
            transitions: self.transitions,
            init_steps: self.init_steps,
            parents,
            question_names: self.question_names,
            step_names: self.step_names,
        })
    }
}

/// Immutable terminology shared by every session (behind an `Arc`).
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    questions: Vec<Question>,
    steps: Vec<TestStep>,
    transitions: BTreeMap<TestStepId, StateTransition>,
    init_steps: Vec<TestStepId>,
    parents: BTreeMap<QuestionId, Vec<TestStepId>>,
    question_names: BTreeMap<String, QuestionId>,
    step_names: BTreeMap<String, TestStepId>,
}

impl KnowledgeBase {
    #[must_use]
    pub fn builder() -> KnowledgeBaseBuilder {
        KnowledgeBaseBuilder::new()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(id.0 as usize)
    }

    #[must_use]
    pub fn test_step(&self, id: TestStepId) -> Option<&TestStep> {
        self.steps.get(id.0 as usize)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn test_steps(&self) -> impl Iterator<Item = &TestStep> {
        self.steps.iter()
    }

    #[must_use]
    pub fn question_by_name(&self, name: &str) -> Option<QuestionId> {
        self.question_names.get(name).copied()
    }

    #[must_use]
    pub fn test_step_by_name(&self, name: &str) -> Option<TestStepId> {
        self.step_names.get(name).copied()
    }

    /// Display name of a step; `"?"` for foreign ids.
    #[must_use]
    pub fn step_name(&self, id: TestStepId) -> &str {
        self.test_step(id).map_or("?", TestStep::name)
    }

    #[must_use]
    pub fn question_name(&self, id: QuestionId) -> &str {
        self.question(id).map_or("?", Question::name)
    }

    #[must_use]
    pub fn state_transition(&self, step: TestStepId) -> Option<&StateTransition> {
        self.transitions.get(&step)
    }

    /// All state transitions, ordered by test step id.
    pub fn state_transitions(&self) -> impl Iterator<Item = &StateTransition> {
        self.transitions.values()
    }

    #[must_use]
    pub fn init_steps(&self) -> &[TestStepId] {
        &self.init_steps
    }

    /// Test steps that contain `question`.
    #[must_use]
    pub fn parent_steps(&self, question: QuestionId) -> &[TestStepId] {
        self.parents.get(&question).map_or(&[], Vec::as_slice)
    }

    /// Whether a permanently relevant step asks `question`.
    #[must_use]
    pub fn is_permanently_relevant_question(&self, question: QuestionId) -> bool {
        self.parent_steps(question).iter().any(|s| {
            self.test_step(*s)
                .is_some_and(TestStep::is_permanently_relevant)
        })
    }

    /// Whether `question` is final (check-once).
    #[must_use]
    pub fn is_final(&self, question: QuestionId) -> bool {
        self.question(question).is_some_and(Question::is_final)
    }

    /// Every question that is read by some condition of the knowledge base
    /// or written by some transition.
    #[must_use]
    pub fn state_questions(&self) -> BTreeSet<QuestionId> {
        let mut out = BTreeSet::new();
        for t in self.transitions.values() {
            out.extend(t.assigned_questions());
            out.extend(t.referenced_questions());
        }
        out
    }

    /// Activation conditions of the given steps (steps without one are skipped).
    pub fn activation_conditions<'a>(
        &'a self,
        steps: impl IntoIterator<Item = TestStepId> + 'a,
    ) -> impl Iterator<Item = &'a Condition> + 'a {
        steps
            .into_iter()
            .filter_map(|s| self.state_transition(s))
            .filter_map(StateTransition::activation_condition)
    }
}
