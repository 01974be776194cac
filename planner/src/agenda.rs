//! The interview agenda as seen by the planner.

use std::fmt;

use triage_kernel::knowledge::terminology::TestStepId;
use triage_kernel::session::Session;

/// Answers whether other interview items still wait for answers; a full
/// replan is postponed while they do.
pub trait InterviewAgenda: Send + Sync + fmt::Debug {
    /// Indicated steps that are not fully answered yet, in step order.
    fn pending_steps(&self, session: &Session) -> Vec<TestStepId>;

    fn has_pending_items(&self, session: &Session) -> bool {
        !self.pending_steps(session).is_empty()
    }
}

/// Agenda backed by the session's indications: every indicated step that is
/// not done is pending, whichever source indicated it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicationAgenda;

impl InterviewAgenda for IndicationAgenda {
    fn pending_steps(&self, session: &Session) -> Vec<TestStepId> {
        session
            .indicated_steps()
            .into_iter()
            .filter(|step| !session.is_done(*step))
            .collect()
    }
}
