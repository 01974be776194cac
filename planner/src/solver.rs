//! The cost/benefit solver: builds a search model from the strategic
//! supports, runs the configured search and activates the best path.
//!
//! The solver itself is stateless and cheap to clone; everything that
//! belongs to one interview lives in [`PlannerState`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::terminology::{QuestionKind, SolutionId, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::propagation::PropagationEntry;
use triage_kernel::session::protocol::ProtocolEntry;
use triage_kernel::session::Session;
use triage_kernel::transition::execute::is_applicable;
use triage_search::abort::{AbortStrategy, DefaultAbortStrategy};
use triage_search::algorithm::{SearchAlgorithm, SearchContext};
use triage_search::astar::AStarSearch;
use triage_search::blocking::BlockingReason;
use triage_search::cost::{CostFunction, DefaultCostFunction};
use triage_search::extender::PathExtender;
use triage_search::model::SearchModel;
use triage_search::path::Path;
use triage_search::target::{benefit_ratio, Target};

use crate::agenda::{IndicationAgenda, InterviewAgenda};
use crate::blocking::blocked_test_steps;
use crate::error::ConfigError;
use crate::state::PlannerState;
use crate::strategic::{
    DefaultSolutionsRater, DefaultTargetFunction, SolutionsRater, StrategicSupport, TargetFunction,
};

/// Benefit given to manually selected targets so that they beat every
/// computed target.
pub const USER_SELECTED_BENEFIT: f64 = 1e10;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Other indicated steps still wait for answers.
    PendingAgenda,
    ManualMode,
    /// A manually selected target could not be reached earlier.
    AbortedManualTarget,
    /// No target has a positive benefit.
    NoBenefit,
    /// The solutions rater declined the undiscriminated solutions.
    RejectedSolutions,
    /// Nothing to recalculate: no search has run yet.
    NoSearchModel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanningOutcome {
    PathActivated { target: Vec<TestStepId>, path: Path },
    /// The search ran but reached no target.
    NoPath,
    Skipped(SkipReason),
}

impl PlanningOutcome {
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self, Self::PathActivated { .. })
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CostBenefitSolver {
    target_function: Arc<dyn TargetFunction>,
    cost_function: Arc<dyn CostFunction>,
    search_algorithm: Arc<dyn SearchAlgorithm>,
    abort_strategy: Arc<dyn AbortStrategy>,
    solutions_rater: Arc<dyn SolutionsRater>,
    strategic_supports: Vec<Arc<dyn StrategicSupport>>,
    agenda: Arc<dyn InterviewAgenda>,
    strategic_benefit_factor: f64,
    manual_mode: bool,
}

impl CostBenefitSolver {
    #[must_use]
    pub fn builder() -> CostBenefitSolverBuilder {
        CostBenefitSolverBuilder::default()
    }

    #[must_use]
    pub fn cost_function(&self) -> &Arc<dyn CostFunction> {
        &self.cost_function
    }

    #[must_use]
    pub fn search_algorithm(&self) -> &Arc<dyn SearchAlgorithm> {
        &self.search_algorithm
    }

    #[must_use]
    pub fn abort_strategy(&self) -> &Arc<dyn AbortStrategy> {
        &self.abort_strategy
    }

    #[must_use]
    pub fn strategic_supports(&self) -> &[Arc<dyn StrategicSupport>] {
        &self.strategic_supports
    }

    #[must_use]
    pub fn agenda(&self) -> &Arc<dyn InterviewAgenda> {
        &self.agenda
    }

    #[must_use]
    pub fn strategic_benefit_factor(&self) -> f64 {
        self.strategic_benefit_factor
    }

    /// The solver was configured to never plan on its own.
    #[must_use]
    pub fn is_manual_mode(&self) -> bool {
        self.manual_mode
    }

    /// A copy of this solver searching under a different budget.
    #[must_use]
    pub fn with_abort_strategy(&self, abort_strategy: Arc<dyn AbortStrategy>) -> Self {
        Self {
            abort_strategy,
            ..self.clone()
        }
    }

    // -----------------------------------------------------------------------
    // Planning entry points
    // -----------------------------------------------------------------------

    /// Full replan towards the targets proposed by the strategic supports.
    pub fn calculate_new_path(
        &self,
        state: &mut PlannerState,
        session: &mut Session,
    ) -> PlanningOutcome {
        if self.agenda.has_pending_items(session) {
            debug!("agenda has pending items, no replan");
            return PlanningOutcome::Skipped(SkipReason::PendingAgenda);
        }
        let mut model = self.initialize_search_model(state, session);
        let skip = if model.best_benefit() <= 0.0 {
            Some(SkipReason::NoBenefit)
        } else if !self
            .solutions_rater
            .check(state.undiscriminated_solutions().unwrap_or(&BTreeSet::new()))
        {
            Some(SkipReason::RejectedSolutions)
        } else {
            None
        };
        if skip.is_none() {
            self.search(session, &mut model);
        }
        state.set_search_model(model);
        let outcome = match skip {
            Some(reason) => PlanningOutcome::Skipped(reason),
            None => self.activate_best_path(state, session, false),
        };
        state.activate_next_step(session);
        outcome
    }

    /// Directed replan towards `targets`.
    ///
    /// Targets containing a contra-indicated step are dropped; permanently
    /// relevant steps named by a target may be used. When no target is
    /// reached, automatic planning stays off until the aborted flag is reset.
    pub fn calculate_new_path_to(
        &self,
        state: &mut PlannerState,
        session: &mut Session,
        targets: Vec<Target>,
    ) -> PlanningOutcome {
        state.reset_path(session);
        let mut model = SearchModel::new();
        for (step, reason) in blocked_test_steps(session) {
            model.block_step(step, reason);
        }
        for target in targets {
            if target.steps().iter().any(|s| session.is_contra_indicated(*s)) {
                debug!(target = ?target.steps(), "skipping contra-indicated target");
                continue;
            }
            for step in target.steps() {
                if model.blocked_steps().get(step) == Some(&BlockingReason::PermanentlyRelevant) {
                    model.unblock_step(*step);
                }
            }
            let steps = target.steps().to_vec();
            model.add_target(target);
            model.maximize_benefit(&steps, USER_SELECTED_BENEFIT);
        }
        self.search(session, &mut model);
        state.set_search_model(model);
        let outcome = self.activate_best_path(state, session, true);
        if matches!(outcome, PlanningOutcome::NoPath) {
            info!("manually selected target cannot be reached");
            state.set_aborted_manual_target(true);
        }
        state.activate_next_step(session);
        outcome
    }

    /// Replanning after a propagation frame: retries an unreached manual
    /// target, otherwise runs a full replan.
    pub fn check_path(&self, state: &mut PlannerState, session: &mut Session) -> PlanningOutcome {
        if self.manual_mode || state.is_manual_mode() {
            return PlanningOutcome::Skipped(SkipReason::ManualMode);
        }
        if state.is_aborted_manual_target() {
            return PlanningOutcome::Skipped(SkipReason::AbortedManualTarget);
        }
        if let Some(step) = state.unreached_target() {
            if state.has_current_sequence() || self.agenda.has_pending_items(session) {
                return PlanningOutcome::Skipped(SkipReason::PendingAgenda);
            }
            let outcome = self.calculate_new_path_to(state, session, vec![Target::single(step)]);
            if outcome.is_activated() {
                return outcome;
            }
            debug!("unreached target still unreachable, falling back to full replan");
            state.set_aborted_manual_target(false);
            state.reset_unreached_target();
        }
        self.calculate_new_path(state, session)
    }

    /// Reacts to the changes of one propagation frame.
    ///
    /// The path is reset when one of its steps became contra-indicated, or
    /// when a step of the path was answered and the current step is no
    /// longer applicable.
    pub fn propagate(
        &self,
        state: &mut PlannerState,
        session: &mut Session,
        changes: &[PropagationEntry],
    ) {
        let Some(sequence) = state.current_sequence() else {
            return;
        };
        let sequence: BTreeSet<TestStepId> = sequence.iter().copied().collect();
        let contra_indicated = changes.iter().any(|change| match change {
            PropagationEntry::Indication { step, new, .. } => {
                new.is_contra_indicated() && sequence.contains(step)
            }
            PropagationEntry::Value { .. } => false,
        });
        if contra_indicated {
            info!("a step of the current path was contra-indicated, resetting path");
            state.reset_path(session);
            return;
        }
        let kb = session.knowledge_base();
        let answered_path_step = changes.iter().any(|change| match change {
            PropagationEntry::Value {
                question,
                new: Some(_),
                strategic: false,
                ..
            } => kb
                .parent_steps(*question)
                .iter()
                .any(|s| sequence.contains(s) && session.is_done(*s)),
            PropagationEntry::Value { .. } | PropagationEntry::Indication { .. } => false,
        });
        if !answered_path_step {
            return;
        }
        if let Some(current) = state.current_step() {
            if !session.is_done(current) && !is_applicable(session, current) {
                info!(step = %kb.step_name(current), "current step became inapplicable, resetting path");
                state.reset_path(session);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Model construction
    // -----------------------------------------------------------------------

    fn initialize_search_model(&self, state: &mut PlannerState, session: &Session) -> SearchModel {
        let mut model = SearchModel::new();
        let blocked = blocked_test_steps(session);
        for (step, reason) in &blocked {
            model.block_step(*step, *reason);
        }

        let mut all_solutions: BTreeSet<SolutionId> = BTreeSet::new();
        let mut discriminating: Vec<Vec<TestStepId>> = Vec::new();
        for support in &self.strategic_supports {
            let solutions = support.undiscriminated_solutions(session);
            let questions = support.discriminating_questions(&solutions, session);
            let targets =
                self.target_function
                    .targets(session, &questions, &solutions, support.as_ref());
            for target in targets {
                let steps = target.steps().to_vec();
                let benefit = support.information_gain(&steps, &solutions, session);
                if benefit <= 0.0 {
                    continue;
                }
                model.add_target(target);
                model.maximize_benefit(&steps, benefit);
                match steps.iter().find_map(|s| blocked.get(s)) {
                    Some(reason) => model.block_target(&steps, *reason),
                    None => {
                        if !discriminating.contains(&steps) {
                            discriminating.push(steps);
                        }
                    }
                }
            }
            all_solutions.extend(solutions);
        }
        state.set_undiscriminated_solutions(all_solutions);

        if self.strategic_benefit_factor > 0.0 {
            self.add_strategic_benefit(session, &discriminating, &blocked, &mut model);
        }
        state.set_discriminating_targets(
            discriminating
                .iter()
                .filter_map(|steps| model.target(steps).cloned())
                .collect(),
        );
        model
    }

    /// Adds benefit to steps that can establish final-question values the
    /// targets' preconditions ask for, in proportion to the benefit/cost
    /// ratio of those targets.
    fn add_strategic_benefit(
        &self,
        session: &Session,
        targets: &[Vec<TestStepId>],
        blocked: &BTreeMap<TestStepId, BlockingReason>,
        model: &mut SearchModel,
    ) {
        let kb = session.knowledge_base();
        let mut total = 0.0;
        let mut demanded: Vec<(Condition, f64)> = Vec::new();
        for steps in targets {
            let Some(target) = model.target(steps) else {
                continue;
            };
            let costs: f64 = steps
                .iter()
                .map(|s| self.cost_function.static_costs(*s, kb))
                .sum();
            let ratio = benefit_ratio(target.benefit(), costs);
            if !ratio.is_finite() {
                continue;
            }
            total += ratio;
            let condition = kb
                .state_transition(steps[0])
                .and_then(|t| t.activation_condition());
            if let Some(condition) = condition {
                accumulate_terms(kb, condition, ratio, &mut demanded);
            }
        }
        if total <= 0.0 {
            return;
        }

        for (condition, value) in &demanded {
            let Condition::Equal { question, value: expected } = condition else {
                continue;
            };
            if !kb.is_final(*question) || condition.is_true(session) {
                continue;
            }
            let additive = self.strategic_benefit_factor * value / total;
            for transition in kb.state_transitions() {
                let establishes = transition
                    .post_transitions()
                    .iter()
                    .filter(|vt| vt.question() == *question)
                    .flat_map(|vt| vt.setters())
                    .filter(|setter| {
                        !setter.condition().is_some_and(|c| {
                            c.terminal_objects().iter().any(|q| session.is_answered(*q))
                        })
                    })
                    .any(|setter| setter.answer() == expected);
                if !establishes {
                    continue;
                }
                let step = transition.test_step();
                let key = [step];
                let benefit = model.target(&key).map_or(0.0, Target::benefit) + additive;
                model.add_target(Target::single(step));
                model.maximize_benefit(&key, benefit);
                if let Some(reason) = blocked.get(&step) {
                    model.block_target(&key, *reason);
                }
                debug!(step = %kb.step_name(step), benefit, "strategic benefit");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Search and activation
    // -----------------------------------------------------------------------

    fn search(&self, session: &Session, model: &mut SearchModel) {
        let ctx = SearchContext::new(
            session,
            Arc::clone(&self.cost_function),
            Arc::clone(&self.abort_strategy),
        );
        self.search_algorithm.search(&ctx, model);
        debug!(
            algorithm = self.search_algorithm.name(),
            steps = model.calculation_steps(),
            aborted = model.is_aborted(),
            "search finished"
        );
    }

    fn activate_best_path(
        &self,
        state: &mut PlannerState,
        session: &mut Session,
        manual: bool,
    ) -> PlanningOutcome {
        let best = state.search_model().and_then(|model| {
            let target = model.best_target()?;
            let path = target.min_path()?.clone();
            Some((target.steps().to_vec(), path, model.calculation_steps()))
        });
        let Some((target, path, calculation_steps)) = best else {
            info!("no target reached");
            return PlanningOutcome::NoPath;
        };

        let kb = session.knowledge_base();
        let names = |steps: &[TestStepId]| -> Vec<String> {
            steps.iter().map(|s| kb.step_name(*s).to_owned()).collect()
        };
        let entry = ProtocolEntry::CalculatedPath {
            time: session.propagation_time(),
            path: names(path.steps()),
            target: names(&target),
            costs: path.costs(),
            calculation_steps,
        };
        info!(
            path = ?names(path.steps()),
            digest = %path.digest(),
            costs = path.costs(),
            manual,
            "activating path"
        );
        session.record(entry);
        state.activate_path(session, path.steps(), manual);
        PlanningOutcome::PathActivated { target, path }
    }
}

/// Splits `condition` into the equality terms it demands and credits each
/// with `ratio`. A negated choice is read as "one of the other choices".
fn accumulate_terms(
    kb: &KnowledgeBase,
    condition: &Condition,
    ratio: f64,
    demanded: &mut Vec<(Condition, f64)>,
) {
    match condition {
        Condition::And(terms) | Condition::Or(terms) => {
            for term in terms {
                accumulate_terms(kb, term, ratio, demanded);
            }
        }
        Condition::Not(inner) => {
            let Condition::Equal { question, value } = inner.as_ref() else {
                return;
            };
            let Some(QuestionKind::Choice { choices }) = kb.question(*question).map(|q| q.kind())
            else {
                return;
            };
            for choice in choices {
                let other = Value::choice(choice.as_str());
                if other != *value {
                    credit(Condition::equal(*question, other), ratio, demanded);
                }
            }
        }
        Condition::Equal { .. } => credit(condition.clone(), ratio, demanded),
        Condition::Known(_) => {}
    }
}

fn credit(condition: Condition, ratio: f64, demanded: &mut Vec<(Condition, f64)>) {
    match demanded.iter_mut().find(|(c, _)| *c == condition) {
        Some((_, value)) => *value += ratio,
        None => demanded.push((condition, ratio)),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CostBenefitSolverBuilder {
    target_function: Arc<dyn TargetFunction>,
    cost_function: Arc<dyn CostFunction>,
    search_algorithm: Arc<dyn SearchAlgorithm>,
    abort_strategy: Option<Arc<dyn AbortStrategy>>,
    solutions_rater: Arc<dyn SolutionsRater>,
    strategic_supports: Vec<Arc<dyn StrategicSupport>>,
    agenda: Arc<dyn InterviewAgenda>,
    strategic_benefit_factor: f64,
    manual_mode: bool,
}

impl Default for CostBenefitSolverBuilder {
    fn default() -> Self {
        Self {
            target_function: Arc::new(DefaultTargetFunction),
            cost_function: Arc::new(DefaultCostFunction),
            search_algorithm: Arc::new(PathExtender::new(Arc::new(AStarSearch))),
            abort_strategy: None,
            solutions_rater: Arc::new(DefaultSolutionsRater::default()),
            strategic_supports: Vec::new(),
            agenda: Arc::new(IndicationAgenda),
            strategic_benefit_factor: 0.0,
            manual_mode: false,
        }
    }
}

impl CostBenefitSolverBuilder {
    #[must_use]
    pub fn target_function(mut self, target_function: Arc<dyn TargetFunction>) -> Self {
        self.target_function = target_function;
        self
    }

    #[must_use]
    pub fn cost_function(mut self, cost_function: Arc<dyn CostFunction>) -> Self {
        self.cost_function = cost_function;
        self
    }

    #[must_use]
    pub fn search_algorithm(mut self, search_algorithm: Arc<dyn SearchAlgorithm>) -> Self {
        self.search_algorithm = search_algorithm;
        self
    }

    #[must_use]
    pub fn abort_strategy(mut self, abort_strategy: Arc<dyn AbortStrategy>) -> Self {
        self.abort_strategy = Some(abort_strategy);
        self
    }

    #[must_use]
    pub fn solutions_rater(mut self, solutions_rater: Arc<dyn SolutionsRater>) -> Self {
        self.solutions_rater = solutions_rater;
        self
    }

    #[must_use]
    pub fn strategic_support(mut self, support: Arc<dyn StrategicSupport>) -> Self {
        self.strategic_supports.push(support);
        self
    }

    #[must_use]
    pub fn agenda(mut self, agenda: Arc<dyn InterviewAgenda>) -> Self {
        self.agenda = agenda;
        self
    }

    #[must_use]
    pub fn strategic_benefit_factor(mut self, factor: f64) -> Self {
        self.strategic_benefit_factor = factor;
        self
    }

    #[must_use]
    pub fn manual_mode(mut self, manual: bool) -> Self {
        self.manual_mode = manual;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::NegativeStrategicBenefitFactor`] for a negative
    /// (or NaN) factor.
    pub fn build(self) -> Result<CostBenefitSolver, ConfigError> {
        if self.strategic_benefit_factor.is_nan() || self.strategic_benefit_factor < 0.0 {
            return Err(ConfigError::NegativeStrategicBenefitFactor(
                self.strategic_benefit_factor,
            ));
        }
        let abort_strategy = match self.abort_strategy {
            Some(strategy) => strategy,
            None => Arc::new(DefaultAbortStrategy::default()),
        };
        Ok(CostBenefitSolver {
            target_function: self.target_function,
            cost_function: self.cost_function,
            search_algorithm: self.search_algorithm,
            abort_strategy,
            solutions_rater: self.solutions_rater,
            strategic_supports: self.strategic_supports,
            agenda: self.agenda,
            strategic_benefit_factor: self.strategic_benefit_factor,
            manual_mode: self.manual_mode,
        })
    }
}
