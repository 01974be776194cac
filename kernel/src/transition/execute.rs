//! Executing test steps on session copies.
//!
//! Search and path validation simulate a step by assuming the expected value
//! of each unanswered question and then firing the step's transition.

use crate::knowledge::terminology::TestStepId;
use crate::session::fact::{Fact, FactSource};
use crate::session::Session;

/// Whether the step's transition is applicable. Steps without a transition
/// are always applicable.
#[must_use]
pub fn is_applicable(session: &Session, step: TestStepId) -> bool {
    session
        .knowledge_base()
        .state_transition(step)
        .map_or(true, |t| t.is_applicable(session))
}

/// Answers every unanswered question of `step` with its expected value.
pub fn set_normal_values(session: &mut Session, step: TestStepId) -> Vec<Fact> {
    let Some(test_step) = session.knowledge_base().test_step(step) else {
        return Vec::new();
    };
    let facts: Vec<Fact> = test_step
        .questions()
        .iter()
        .filter(|q| !session.is_answered(**q))
        .filter_map(|q| {
            let expected = session.knowledge_base().question(*q)?.expected_value()?;
            Some(Fact::new(*q, expected, FactSource::Search))
        })
        .collect();
    for fact in &facts {
        session.add_fact(fact.clone());
    }
    facts
}

/// Simulates `step`: normal values, then the transition (if any).
pub fn apply_step(session: &mut Session, step: TestStepId) -> Vec<Fact> {
    let mut facts = set_normal_values(session, step);
    if let Some(transition) = session.knowledge_base_arc().state_transition(step).cloned() {
        facts.extend(transition.fire(session));
    }
    facts
}

/// Validates `steps[position..]` on a copy of `session`: every step must be
/// applicable in the state left by its predecessors.
#[must_use]
pub fn check_path(session: &Session, steps: &[TestStepId], position: usize) -> bool {
    let mut copy = session.search_copy();
    for &step in steps.iter().skip(position) {
        if !is_applicable(&copy, step) {
            return false;
        }
        apply_step(&mut copy, step);
    }
    true
}
