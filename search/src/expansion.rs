//! Successor generation shared by the concrete searches.
//!
//! An [`ExpansionPlan`] is computed once per search run from the session and
//! the model: the usable successor steps (supportive hull plus target
//! steps), the questions that make up the search state, and the steps whose
//! presence on a path matters for multi-step targets.

use std::collections::BTreeSet;

use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::state_transition::StateTransition;
use triage_kernel::knowledge::terminology::{QuestionId, TestStep, TestStepId};
use triage_kernel::proof::hash::{canonical_hash, ContentHash};
use triage_kernel::proof::hash_domain::HashDomain;
use triage_kernel::session::Session;
use triage_kernel::transition::execute::{apply_step, is_applicable};
use tracing::debug;

use crate::algorithm::SearchContext;
use crate::blocking::BlockingReason;
use crate::hull::supportive_transitions;
use crate::model::SearchModel;
use crate::path::Path;

#[derive(Debug, Clone)]
pub struct ExpansionPlan {
    successors: Vec<TestStepId>,
    target_only: BTreeSet<TestStepId>,
    state_questions: BTreeSet<QuestionId>,
    progress_steps: BTreeSet<TestStepId>,
}

impl ExpansionPlan {
    #[must_use]
    pub fn new(session: &Session, model: &SearchModel) -> Self {
        let kb = session.knowledge_base();
        let target_steps = model.target_steps();

        let usable: Vec<&StateTransition> = kb
            .state_transitions()
            .filter(|t| !model.is_step_blocked(t.test_step()))
            .filter(|t| {
                kb.test_step(t.test_step())
                    .is_some_and(|s| !s.is_target_only())
            })
            .collect();
        let hull = supportive_transitions(
            &usable,
            kb.activation_conditions(target_steps.iter().copied()),
        );

        let mut successors: BTreeSet<TestStepId> =
            hull.iter().map(|t| t.test_step()).collect();
        successors.extend(
            target_steps
                .iter()
                .copied()
                .filter(|s| !model.is_step_blocked(*s)),
        );

        let mut state_questions = BTreeSet::new();
        let mut target_only = BTreeSet::new();
        for step in &successors {
            let Some(test_step) = kb.test_step(*step) else {
                continue;
            };
            if test_step.is_target_only() {
                target_only.insert(*step);
            }
            state_questions.extend(test_step.questions().iter().copied());
            for supplement in test_step.cost_supplements() {
                state_questions.extend(supplement.condition.terminal_objects());
            }
            if let Some(t) = kb.state_transition(*step) {
                state_questions.extend(t.assigned_questions());
                state_questions.extend(t.referenced_questions());
            }
        }

        let progress_steps = model
            .active_targets()
            .filter(|t| t.steps().len() > 1)
            .flat_map(|t| t.steps().iter().copied())
            .collect();

        Self {
            successors: successors.into_iter().collect(),
            target_only,
            state_questions,
            progress_steps,
        }
    }

    #[must_use]
    pub fn successors(&self) -> &[TestStepId] {
        &self.successors
    }

    #[must_use]
    pub fn is_target_only(&self, step: TestStepId) -> bool {
        self.target_only.contains(&step)
    }

    /// Blocks targets with a step whose activation condition is false now
    /// and reads only questions no successor can change.
    pub fn block_unreachable_targets(&self, session: &Session, model: &mut SearchModel) {
        let kb = session.knowledge_base();
        let mut writable: BTreeSet<QuestionId> = BTreeSet::new();
        for step in &self.successors {
            if let Some(t) = kb.test_step(*step) {
                writable.extend(t.questions().iter().copied());
            }
            if let Some(t) = kb.state_transition(*step) {
                writable.extend(t.assigned_questions());
            }
        }

        let unreachable: Vec<Vec<TestStepId>> = model
            .active_targets()
            .filter(|target| {
                target.steps().iter().any(|step| {
                    kb.state_transition(*step)
                        .and_then(StateTransition::activation_condition)
                        .is_some_and(|c| {
                            !c.is_true(session) && c.terminal_objects().is_disjoint(&writable)
                        })
                })
            })
            .map(|t| t.steps().to_vec())
            .collect();
        for steps in unreachable {
            debug!(target = ?steps, "blocking unreachable target");
            model.block_target(&steps, BlockingReason::CannotReach);
        }
    }

    /// Expands `parent_path` by `step`, or `None` if the step may not follow.
    ///
    /// A step may not repeat its predecessor, must not be contra-indicated,
    /// must be applicable, and may appear only once on a path if its cost is
    /// negative. The cost is taken in the parent state.
    #[must_use]
    pub fn expand(
        &self,
        ctx: &SearchContext,
        parent: &Session,
        parent_path: &Path,
        step: TestStepId,
        model: &SearchModel,
    ) -> Option<(Session, Path)> {
        if parent_path.last() == Some(step)
            || model.is_step_blocked(step)
            || parent.is_contra_indicated(step)
            || !is_applicable(parent, step)
        {
            return None;
        }
        let cost = ctx.cost_function().costs(step, parent);
        if cost < 0.0 && parent_path.contains(step) {
            return None;
        }
        let mut child = parent.search_copy();
        apply_step(&mut child, step);
        Some((child, parent_path.extended(step, cost)))
    }

    /// Identity of a search node: the state question values plus which
    /// multi-step target steps the path already contains.
    #[must_use]
    pub fn fingerprint(&self, session: &Session, path: &Path) -> ContentHash {
        let state = session.state_fingerprint(&self.state_questions);
        let mut data = state.as_str().as_bytes().to_vec();
        for step in &self.progress_steps {
            if path.contains(*step) {
                data.extend_from_slice(&step.0.to_le_bytes());
            }
        }
        canonical_hash(HashDomain::SearchState, &data)
    }

    /// Every unblocked target has a minimal path no more expensive than
    /// `bound`; no cheaper path can appear once all frontier costs exceed it.
    #[must_use]
    pub fn all_targets_settled(model: &SearchModel, bound: f64) -> bool {
        let mut any = false;
        for target in model.active_targets() {
            any = true;
            match target.min_path() {
                Some(p) if p.costs() <= bound => {}
                _ => return false,
            }
        }
        any
    }
}

/// Steps that are comfort steps in the knowledge base.
#[must_use]
pub fn comfort_steps(session: &Session) -> Vec<&TestStep> {
    session
        .knowledge_base()
        .test_steps()
        .filter(|s| s.comfort_benefit().is_some())
        .collect()
}

/// Activation condition plus the comfort condition of `step`.
#[must_use]
pub fn is_comfort_applicable(session: &Session, step: &TestStep) -> bool {
    let comfort_ok = step
        .comfort_benefit()
        .and_then(|c| c.condition.as_ref())
        .map_or(true, |c: &Condition| c.is_true(session));
    comfort_ok && is_applicable(session, step.id())
}
