//! Fires state transitions of answered test steps during propagation.
//!
//! A fully answered step fires when it is the current step of the path,
//! when it is the step fired last (its old facts are replaced), or when it
//! is an init step whose transition applies and no path has started yet.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use triage_kernel::knowledge::terminology::TestStepId;
use triage_kernel::session::fact::Fact;
use triage_kernel::session::propagation::PropagationEntry;
use triage_kernel::session::protocol::ProtocolEntry;
use triage_kernel::session::Session;

use crate::state::PlannerState;
use crate::strategic::StrategicSupport;

/// Per-session memory of the transition driver.
#[derive(Debug, Clone, Default)]
pub struct DriverState {
    last_step: Option<TestStepId>,
    last_facts: Vec<Fact>,
    active_init_steps: BTreeSet<TestStepId>,
}

impl DriverState {
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            active_init_steps: session.knowledge_base().init_steps().iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Step whose transition fired last.
    #[must_use]
    pub fn last_fired(&self) -> Option<TestStepId> {
        self.last_step
    }

    #[must_use]
    pub fn active_init_steps(&self) -> &BTreeSet<TestStepId> {
        &self.active_init_steps
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StateTransitionDriver;

impl StateTransitionDriver {
    pub fn propagate(
        &self,
        driver: &mut DriverState,
        planner: &mut PlannerState,
        session: &mut Session,
        changes: &[PropagationEntry],
        supports: &[Arc<dyn StrategicSupport>],
    ) {
        let kb = Arc::clone(session.knowledge_base_arc());
        let answered: BTreeSet<TestStepId> = changes
            .iter()
            .filter(|c| !c.is_strategic() && c.has_changed())
            .filter_map(PropagationEntry::question)
            .flat_map(|q| kb.parent_steps(q).iter().copied())
            .collect();

        if planner.current_step().is_some() {
            driver.active_init_steps.clear();
        }

        for step in answered {
            let Some(transition) = kb.state_transition(step) else {
                continue;
            };
            if !session.is_done(step) {
                continue;
            }
            let fire = if planner.current_step() == Some(step) {
                true
            } else if driver.last_step == Some(step) {
                for fact in driver.last_facts.drain(..) {
                    session.remove_fact(&fact);
                }
                true
            } else {
                driver.active_init_steps.contains(&step) && transition.is_applicable(session)
            };
            if !fire {
                continue;
            }

            debug!(step = %kb.step_name(step), "firing state transition");
            let facts = transition.fire(session);
            let time = session.propagation_time();
            for fact in &facts {
                session.record(ProtocolEntry::Fact {
                    time,
                    question: kb.question_name(fact.question()).to_owned(),
                    value: fact.value().to_string(),
                });
            }
            driver.last_facts = facts;
            driver.last_step = Some(step);

            if planner.has_changed_undiscriminated_solutions(session, supports) {
                planner.reset_path(session);
                return;
            }
            planner.activate_next_step(session);
            planner.cleanup_indication(session, step);
        }
    }
}
