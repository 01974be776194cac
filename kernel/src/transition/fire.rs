//! Firing a [`StateTransition`] against a session.

use std::sync::Arc;

use crate::knowledge::state_transition::StateTransition;
use crate::knowledge::terminology::TestStep;
use crate::session::fact::{Fact, FactSource};
use crate::session::Session;

impl StateTransition {
    /// Fires every value transition and asserts the winners as facts.
    ///
    /// All setters are evaluated against the state before firing, so one
    /// value transition never sees the effect of another. The facts join the
    /// caller's propagation frame (or stay pending until the next commit) and
    /// are returned in value transition order. A question whose setters all
    /// fail is left alone.
    pub fn fire(&self, session: &mut Session) -> Vec<Fact> {
        let kb = Arc::clone(session.knowledge_base_arc());
        let step = self.test_step();
        let step_relevant = kb
            .test_step(step)
            .is_some_and(TestStep::is_permanently_relevant);

        let facts: Vec<Fact> = self
            .post_transitions()
            .iter()
            .filter_map(|vt| {
                let setter = vt.winning_setter(session)?;
                let permanently_relevant = step_relevant
                    || setter.condition().is_some_and(|c| {
                        c.terminal_objects()
                            .into_iter()
                            .any(|q| kb.is_permanently_relevant_question(q))
                    });
                Some(Fact::new(
                    vt.question(),
                    setter.answer().clone(),
                    FactSource::Transition {
                        step,
                        setter: setter.clone(),
                        permanently_relevant,
                    },
                ))
            })
            .collect();

        for fact in &facts {
            session.add_fact(fact.clone());
        }
        facts
    }
}
