//! One interview: a session plus the planner machinery that drives it.
//!
//! Every mutation runs in a propagation frame. Inside the frame the changes
//! are dispatched to the transition driver, then to the solver's
//! `propagate`, and finally the solver's `check_path` may replan.

use std::sync::Arc;

use tracing::debug;

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::terminology::{QuestionId, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::indication::{Indication, IndicationSource};
use triage_kernel::session::propagation::PropagationEntry;
use triage_kernel::session::Session;

use crate::config::PlannerConfig;
use crate::error::ConfigError;
use crate::expert::ExpertMode;
use crate::solver::{CostBenefitSolver, PlanningOutcome};
use crate::state::PlannerState;
use crate::strategic::StrategicSupport;
use crate::transition_driver::{DriverState, StateTransitionDriver};

/// Result of one propagation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<R = ()> {
    pub result: R,
    /// What the post-propagation replan did.
    pub replan: PlanningOutcome,
    /// Every change committed by the frame, in order.
    pub changes: Vec<PropagationEntry>,
}

#[derive(Debug)]
pub struct InterviewEngine {
    pub(crate) session: Session,
    pub(crate) solver: CostBenefitSolver,
    pub(crate) planner: PlannerState,
    driver_state: DriverState,
    driver: StateTransitionDriver,
}

impl InterviewEngine {
    #[must_use]
    pub fn new(knowledge_base: Arc<KnowledgeBase>, solver: CostBenefitSolver) -> Self {
        let session = Session::new(knowledge_base);
        let driver_state = DriverState::new(&session);
        Self {
            session,
            solver,
            planner: PlannerState::new(),
            driver_state,
            driver: StateTransitionDriver,
        }
    }

    /// Builds an engine from a configuration and the strategic supports
    /// that propose its targets.
    ///
    /// # Errors
    ///
    /// Returns the configuration's validation errors and
    /// [`ConfigError::UnknownTestStep`] for unknown watched steps.
    pub fn from_config(
        knowledge_base: Arc<KnowledgeBase>,
        config: &PlannerConfig,
        supports: impl IntoIterator<Item = Arc<dyn StrategicSupport>>,
    ) -> Result<Self, ConfigError> {
        let watched = config.watched_steps(&knowledge_base)?;
        let solver = supports
            .into_iter()
            .fold(config.solver_builder()?, |b, s| b.strategic_support(s))
            .build()?;
        let mut engine = Self::new(knowledge_base, solver);
        for step in watched {
            engine.planner.watch(step);
        }
        Ok(engine)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn planner(&self) -> &PlannerState {
        &self.planner
    }

    #[must_use]
    pub fn solver(&self) -> &CostBenefitSolver {
        &self.solver
    }

    #[must_use]
    pub fn driver_state(&self) -> &DriverState {
        &self.driver_state
    }

    /// The step the interview should ask next.
    #[must_use]
    pub fn current_step(&self) -> Option<TestStepId> {
        self.planner.current_step()
    }

    pub fn watch(&mut self, step: TestStepId) {
        self.planner.watch(step);
    }

    pub fn expert_mode(&mut self) -> ExpertMode<'_> {
        ExpertMode::new(self)
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    /// Runs an empty frame, which lets the planner compute its first path.
    pub fn start(&mut self) -> Frame {
        self.in_frame(|_| ())
    }

    /// Answers `question` as the user.
    pub fn answer(&mut self, question: QuestionId, value: Value) -> Frame {
        self.in_frame(|e| e.session.set_value(question, value))
    }

    /// Answers several questions in one frame.
    pub fn answer_all(&mut self, answers: impl IntoIterator<Item = (QuestionId, Value)>) -> Frame {
        self.in_frame(|e| {
            for (question, value) in answers {
                e.session.set_value(question, value);
            }
        })
    }

    /// Withdraws the user answer of `question`.
    pub fn retract(&mut self, question: QuestionId) -> Frame {
        self.in_frame(|e| {
            e.session.retract_user_value(question);
        })
    }

    /// Sets an indication from outside the planner, e.g. a rule
    /// contra-indicating a step.
    pub fn set_indication(
        &mut self,
        step: TestStepId,
        source: IndicationSource,
        indication: Indication,
    ) -> Frame {
        self.in_frame(|e| e.session.set_indication(step, source, indication))
    }

    pub(crate) fn in_frame<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Frame<R> {
        self.session.open_propagation();
        let result = f(self);
        let mut changes = self.session.drain_changes();
        self.driver.propagate(
            &mut self.driver_state,
            &mut self.planner,
            &mut self.session,
            &changes,
            self.solver.strategic_supports(),
        );
        self.solver
            .propagate(&mut self.planner, &mut self.session, &changes);
        let replan = self.solver.check_path(&mut self.planner, &mut self.session);
        debug!(?replan, time = self.session.propagation_time(), "frame finished");
        changes.extend(self.session.commit_propagation());
        Frame {
            result,
            replan,
            changes,
        }
    }
}
