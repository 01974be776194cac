//! Supportive state transition hull.
//!
//! Starting from the states a set of conditions reads, collect every
//! transition that writes one of them, then the states those transitions
//! read in turn, until no new state appears. Each state is processed once,
//! so cyclic knowledge bases terminate.

use std::collections::BTreeSet;

use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::state_transition::StateTransition;
use triage_kernel::knowledge::terminology::{QuestionId, TestStepId};

/// Transitions (from `transitions`) that can contribute to satisfying
/// `conditions`, ordered by test step id, without duplicates.
#[must_use]
pub fn supportive_transitions<'a, I>(
    transitions: &[&'a StateTransition],
    conditions: I,
) -> Vec<&'a StateTransition>
where
    I: IntoIterator<Item = &'a Condition>,
{
    let mut pending: Vec<QuestionId> = conditions
        .into_iter()
        .flat_map(Condition::terminal_objects)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut processed: BTreeSet<QuestionId> = BTreeSet::new();
    let mut chosen: BTreeSet<TestStepId> = BTreeSet::new();
    let mut hull: Vec<&StateTransition> = Vec::new();

    while let Some(state) = pending.pop() {
        if !processed.insert(state) {
            continue;
        }
        for transition in transitions {
            if !transition.assigned_questions().contains(&state) {
                continue;
            }
            if !chosen.insert(transition.test_step()) {
                continue;
            }
            hull.push(transition);
            pending.extend(
                transition
                    .referenced_questions()
                    .into_iter()
                    .filter(|q| !processed.contains(q)),
            );
        }
    }

    hull.sort_by_key(|t| t.test_step());
    hull
}
