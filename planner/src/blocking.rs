//! Which test steps may not be used by the next search, and why.
//!
//! A step is blocked when it is contra-indicated in the live session, when
//! it is permanently relevant (such steps are offered separately and never
//! compete as ordinary targets), or when its activation condition is
//! provably false given the final questions that already left their init
//! value. Final questions never change back, so that proof is simulated on a
//! blank copy holding only those diverged values.

use std::collections::{BTreeMap, BTreeSet};

use triage_kernel::knowledge::terminology::{Question, QuestionId, TestStep, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::fact::{Fact, FactSource};
use triage_kernel::session::Session;
use triage_kernel::transition::execute::set_normal_values;
use triage_search::blocking::BlockingReason;

/// Final questions whose current value differs from their init value.
#[must_use]
pub fn final_values(session: &Session) -> BTreeMap<QuestionId, Value> {
    session
        .knowledge_base()
        .questions()
        .filter(|q| q.is_final())
        .filter_map(|q| {
            let actual = session.value(q.id())?;
            (q.init_value() != Some(actual)).then(|| (q.id(), actual.clone()))
        })
        .collect()
}

/// Blocked steps with their reason, in step order.
#[must_use]
pub fn blocked_test_steps(session: &Session) -> BTreeMap<TestStepId, BlockingReason> {
    let kb = session.knowledge_base();
    let mut proof = session.blank_copy();
    for (question, value) in final_values(session) {
        proof.add_fact(Fact::new(question, value, FactSource::User));
    }

    let mut blocked = BTreeMap::new();
    for test_step in kb.test_steps() {
        let step = test_step.id();
        if session.is_contra_indicated(step) {
            blocked.insert(step, BlockingReason::ContraIndicated);
            continue;
        }
        if test_step.is_permanently_relevant() {
            blocked.insert(step, BlockingReason::PermanentlyRelevant);
            continue;
        }
        let Some(condition) = kb
            .state_transition(step)
            .and_then(|t| t.activation_condition())
        else {
            continue;
        };
        // Indeterminate conditions prove nothing.
        if condition.eval(&proof) == Ok(false) {
            blocked.insert(step, BlockingReason::CheckOnceFalse);
        }
    }
    blocked
}

/// Per final question, every value some ordinary (not permanently
/// relevant) step assigns when all steps are executed one after another on
/// a single copy of the session. Questions no step assigns are absent.
#[must_use]
pub fn reachable_final_values(session: &Session) -> BTreeMap<QuestionId, BTreeSet<Value>> {
    let kb = session.knowledge_base();
    let mut copy = session.search_copy();
    let mut reachable: BTreeMap<QuestionId, BTreeSet<Value>> = BTreeMap::new();
    for transition in kb.state_transitions() {
        let step = transition.test_step();
        if kb.test_step(step).is_some_and(TestStep::is_permanently_relevant) {
            continue;
        }
        set_normal_values(&mut copy, step);
        for fact in transition.fire(&mut copy) {
            if kb.question(fact.question()).is_some_and(Question::is_final) {
                reachable
                    .entry(fact.question())
                    .or_default()
                    .insert(fact.value().clone());
            }
        }
    }
    reachable
}
