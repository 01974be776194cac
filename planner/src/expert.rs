//! Manual steering of the planner: selecting targets by hand, inspecting
//! the targets of the last search and recalculating with a larger budget.
//!
//! Every selection runs in its own propagation frame of the engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use triage_kernel::knowledge::terminology::{QuestionId, TestStep, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::fact::FactSource;
use triage_kernel::session::protocol::ProtocolEntry;
use triage_search::abort::DefaultAbortStrategy;
use triage_search::error::SearchError;
use triage_search::model::SearchModel;
use triage_search::target::Target;

use crate::blocking;
use crate::engine::InterviewEngine;
use crate::solver::{PlanningOutcome, SkipReason, USER_SELECTED_BENEFIT};

/// Budget multiplier of [`ExpertMode::recalculate`].
const RECALCULATION_STEP_FACTOR: u64 = 2;
const RECALCULATION_INCREASING_FACTOR: f64 = 2.5;

#[derive(Debug)]
pub struct ExpertMode<'e> {
    engine: &'e mut InterviewEngine,
}

impl<'e> ExpertMode<'e> {
    pub(crate) fn new(engine: &'e mut InterviewEngine) -> Self {
        Self { engine }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Plans a path to `target` and protocols the selection.
    pub fn select_target(&mut self, target: Target) -> PlanningOutcome {
        self.engine
            .in_frame(|e| {
                let kb = e.session.knowledge_base();
                let names = target
                    .steps()
                    .iter()
                    .map(|s| kb.step_name(*s).to_owned())
                    .collect();
                let time = e.session.propagation_time();
                e.session.record(ProtocolEntry::ManualTargetSelection {
                    time,
                    target: names,
                });
                e.solver
                    .calculate_new_path_to(&mut e.planner, &mut e.session, vec![target])
            })
            .result
    }

    pub fn select_step(&mut self, step: TestStepId) -> PlanningOutcome {
        self.select_target(Target::single(step))
    }

    /// Plans towards whichever of `steps` is cheapest to reach.
    pub fn select_cheapest_target(&mut self, steps: &[TestStepId]) -> PlanningOutcome {
        let targets = steps.iter().map(|s| Target::single(*s)).collect();
        self.engine
            .in_frame(|e| {
                e.solver
                    .calculate_new_path_to(&mut e.planner, &mut e.session, targets)
            })
            .result
    }

    /// Drops the current path, including a remembered manual target, and
    /// runs a full replan.
    pub fn unselect_target(&mut self) -> PlanningOutcome {
        self.engine
            .in_frame(|e| {
                e.planner.reset_path(&mut e.session);
                e.planner.reset_unreached_target();
                e.solver.calculate_new_path(&mut e.planner, &mut e.session)
            })
            .result
    }

    /// Drops the current path and lets the post-propagation replan choose
    /// the best sequence.
    pub fn select_best_sequence(&mut self) -> PlanningOutcome {
        self.engine
            .in_frame(|e| {
                e.planner.reset_path(&mut e.session);
                e.planner.reset_unreached_target();
            })
            .replan
    }

    /// Repeats the last calculation with twice the step budget of the
    /// current abort strategy. A manually selected target is selected again;
    /// otherwise the best sequence is recalculated.
    ///
    /// # Errors
    ///
    /// Propagates [`SearchError`] from building the boosted abort strategy.
    pub fn recalculate(&mut self) -> Result<PlanningOutcome, SearchError> {
        let Some(model) = self.engine.planner.search_model() else {
            return Ok(PlanningOutcome::Skipped(SkipReason::NoSearchModel));
        };
        let last_max_steps = self
            .engine
            .solver
            .abort_strategy()
            .max_steps()
            .unwrap_or_else(|| model.calculation_steps());
        let manual_target = manual_target(model);
        let boosted = DefaultAbortStrategy::new(
            last_max_steps
                .saturating_mul(RECALCULATION_STEP_FACTOR)
                .max(1),
            RECALCULATION_INCREASING_FACTOR,
        )?;

        let boosted_solver = self.engine.solver.with_abort_strategy(Arc::new(boosted));
        let original = std::mem::replace(&mut self.engine.solver, boosted_solver);
        let outcome = match manual_target {
            Some(steps) => Target::new(steps).map(|target| self.select_target(target)),
            None => Ok(self.select_best_sequence()),
        };
        self.engine.solver = original;
        outcome
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn search_model(&self) -> Option<&SearchModel> {
        self.engine.planner.search_model()
    }

    /// Best target of the last search.
    #[must_use]
    pub fn current_target(&self) -> Option<&Target> {
        self.search_model().and_then(SearchModel::best_target)
    }

    /// Targets of the last full plan by descending benefit, optionally
    /// without the current one.
    #[must_use]
    pub fn alternative_targets(&self, include_current: bool) -> Vec<Target> {
        let current = self.current_target().map(Target::steps);
        let mut targets: Vec<Target> = self
            .engine
            .planner
            .discriminating_targets()
            .iter()
            .filter(|t| include_current || Some(t.steps()) != current)
            .cloned()
            .collect();
        sort_by_benefit(&mut targets);
        targets
    }

    /// Every target of the last search, blocked ones included, by descending
    /// benefit. With `current_first` the current target leads.
    #[must_use]
    pub fn calculated_targets(&self, current_first: bool) -> Vec<Target> {
        let Some(model) = self.search_model() else {
            return Vec::new();
        };
        let mut targets: Vec<Target> = model.targets().cloned().collect();
        sort_by_benefit(&mut targets);
        if current_first {
            if let Some(current) = model.best_target() {
                if let Some(position) = targets.iter().position(|t| t.steps() == current.steps()) {
                    let target = targets.remove(position);
                    targets.insert(0, target);
                }
            }
        }
        targets
    }

    /// Whether the user already answered a question of the current step.
    #[must_use]
    pub fn is_current_step_user_touched(&self) -> bool {
        let session = &self.engine.session;
        let Some(step) = self.engine.planner.current_step() else {
            return false;
        };
        session
            .knowledge_base()
            .test_step(step)
            .is_some_and(|s| {
                s.questions().iter().any(|q| {
                    session
                        .facts(*q)
                        .iter()
                        .any(|f| *f.source() == FactSource::User)
                })
            })
    }

    /// Permanently relevant steps whose activation condition holds (or that
    /// have none).
    #[must_use]
    pub fn applicable_permanently_relevant_steps(&self) -> Vec<TestStepId> {
        let session = &self.engine.session;
        let kb = session.knowledge_base();
        kb.test_steps()
            .filter(|s| s.is_permanently_relevant())
            .map(TestStep::id)
            .filter(|step| {
                kb.state_transition(*step)
                    .and_then(|t| t.activation_condition())
                    .map_or(true, |c| c.is_true(session))
            })
            .collect()
    }

    /// Values the final questions could still take if every ordinary step
    /// were carried out.
    #[must_use]
    pub fn reachable_final_values(&self) -> BTreeMap<QuestionId, BTreeSet<Value>> {
        blocking::reachable_final_values(&self.engine.session)
    }

    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn is_manual_mode(&self) -> bool {
        self.engine.solver.is_manual_mode() || self.engine.planner.is_manual_mode()
    }

    /// Switches manual mode. Leaving manual mode without an active path
    /// triggers a replan, whose outcome is returned.
    pub fn set_manual_mode(&mut self, manual: bool) -> Option<PlanningOutcome> {
        let was_manual = self.is_manual_mode();
        self.engine.planner.set_manual_mode(manual);
        if was_manual && !self.is_manual_mode() && !self.engine.planner.has_current_sequence() {
            return Some(self.engine.in_frame(|_| ()).replan);
        }
        None
    }

    /// Re-enables automatic planning after a manual target could not be
    /// reached.
    pub fn reset_after_abort(&mut self) {
        self.engine.planner.set_aborted_manual_target(false);
    }
}

/// The steps of a model's only target when that target was selected by hand.
fn manual_target(model: &SearchModel) -> Option<Vec<TestStepId>> {
    let mut targets = model.targets();
    match (targets.next(), targets.next()) {
        (Some(only), None) if only.benefit() >= USER_SELECTED_BENEFIT => Some(only.steps().to_vec()),
        _ => None,
    }
}

fn sort_by_benefit(targets: &mut [Target]) {
    targets.sort_by(|a, b| b.benefit().total_cmp(&a.benefit()));
}
