//! State transition lock tests.
//!
//! Proves:
//! 1. A setter without condition is the default: it wins whenever the
//!    setters before it do not hold, including indeterminate conditions
//! 2. The supportive hull terminates on cyclic knowledge bases and equals
//!    the backward closure from the seed states, without duplicates

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::state_transition::{
    ConditionalValueSetter, StateTransition, ValueTransition,
};
use triage_kernel::knowledge::terminology::{Question, QuestionId, TestStep, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::Session;
use triage_search::hull::supportive_transitions;

// ---------------------------------------------------------------------------
// 1. Default setter
// ---------------------------------------------------------------------------

struct Thermostat {
    session: Session,
    mode: QuestionId,
    target: QuestionId,
    transition: StateTransition,
}

/// `adjust` sets target := hot when mode = heat, otherwise target := mild.
fn thermostat(mode_init: Option<&str>) -> Thermostat {
    let mut b = KnowledgeBase::builder();
    let mut mode_question = Question::choice("mode", ["heat", "cool"]);
    if let Some(init) = mode_init {
        mode_question = mode_question.with_init_value(Value::choice(init));
    }
    let mode = b.add_question(mode_question).unwrap();
    let target = b
        .add_question(Question::choice("target", ["mild", "hot"]))
        .unwrap();
    let adjust = b.add_test_step(TestStep::new("adjust", 1.0)).unwrap();
    let transition = StateTransition::new(
        adjust,
        None,
        vec![ValueTransition::new(
            target,
            vec![
                ConditionalValueSetter::new(
                    Value::choice("hot"),
                    Some(Condition::equal(mode, Value::choice("heat"))),
                ),
                ConditionalValueSetter::always(Value::choice("mild")),
            ],
        )],
    );
    b.add_state_transition(transition.clone()).unwrap();
    Thermostat {
        session: Session::new(Arc::new(b.build().unwrap())),
        mode,
        target,
        transition,
    }
}

#[test]
fn default_setter_applies_when_first_condition_is_false() {
    let mut t = thermostat(Some("cool"));
    let facts = t.transition.fire(&mut t.session);
    assert_eq!(facts.len(), 1);
    assert_eq!(t.session.value(t.target), Some(&Value::choice("mild")));
}

#[test]
fn default_setter_applies_when_first_condition_is_indeterminate() {
    let mut t = thermostat(None);
    assert_eq!(t.session.value(t.mode), None);
    t.transition.fire(&mut t.session);
    assert_eq!(t.session.value(t.target), Some(&Value::choice("mild")));
}

#[test]
fn earlier_setter_wins_when_it_holds() {
    let mut t = thermostat(Some("cool"));
    t.session.set_value(t.mode, Value::choice("heat"));
    t.transition.fire(&mut t.session);
    assert_eq!(t.session.value(t.target), Some(&Value::choice("hot")));
}

#[test]
fn refiring_replaces_the_previous_value() {
    let mut t = thermostat(Some("heat"));
    t.transition.fire(&mut t.session);
    t.session.set_value(t.mode, Value::choice("cool"));
    t.transition.fire(&mut t.session);
    assert_eq!(t.session.value(t.target), Some(&Value::choice("mild")));
}

// ---------------------------------------------------------------------------
// 2. Supportive hull
// ---------------------------------------------------------------------------

/// Transition `i` writes question `i` and reads the questions in
/// `reads[i]`; indexes wrap around, so cycles are common.
fn graph_kb(reads: &[Vec<usize>]) -> (KnowledgeBase, Vec<QuestionId>, Vec<TestStepId>) {
    let n = reads.len();
    let mut b = KnowledgeBase::builder();
    let questions: Vec<QuestionId> = (0..n)
        .map(|i| {
            b.add_question(Question::choice(format!("q{i}"), ["a", "b"]))
                .unwrap()
        })
        .collect();
    let steps: Vec<TestStepId> = (0..n)
        .map(|i| b.add_test_step(TestStep::new(format!("t{i}"), 1.0)).unwrap())
        .collect();
    for (i, read) in reads.iter().enumerate() {
        let read: BTreeSet<usize> = read.iter().map(|r| r % n).collect();
        let condition = (!read.is_empty()).then(|| {
            Condition::and(
                read.iter()
                    .map(|r| Condition::equal(questions[*r], Value::choice("a"))),
            )
        });
        b.add_state_transition(StateTransition::new(
            steps[i],
            condition,
            vec![ValueTransition::new(
                questions[i],
                vec![ConditionalValueSetter::always(Value::choice("b"))],
            )],
        ))
        .unwrap();
    }
    (b.build().unwrap(), questions, steps)
}

/// Reference closure: states needed by the seed, then the states read by
/// every transition writing a needed state.
fn expected_hull(reads: &[Vec<usize>], seeds: &BTreeSet<usize>) -> BTreeSet<usize> {
    let n = reads.len();
    let mut needed = seeds.clone();
    loop {
        let before = needed.len();
        let snapshot: Vec<usize> = needed.iter().copied().collect();
        for state in snapshot {
            needed.extend(reads[state].iter().map(|r| r % n));
        }
        if needed.len() == before {
            return needed;
        }
    }
}

fn arb_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (1usize..10).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(0..n, 0..3), n),
            prop::collection::vec(0..n, 1..3),
        )
    })
}

proptest! {
    #[test]
    fn hull_is_the_backward_closure((reads, seeds) in arb_graph()) {
        let (kb, questions, steps) = graph_kb(&reads);
        let all: Vec<&StateTransition> = kb.state_transitions().collect();
        let seed_conditions: Vec<Condition> = seeds
            .iter()
            .map(|s| Condition::equal(questions[*s], Value::choice("b")))
            .collect();

        let hull = supportive_transitions(&all, seed_conditions.iter());

        let hull_steps: Vec<TestStepId> = hull.iter().map(|t| t.test_step()).collect();
        let unique: BTreeSet<TestStepId> = hull_steps.iter().copied().collect();
        prop_assert_eq!(unique.len(), hull_steps.len(), "duplicate transitions in hull");
        prop_assert!(hull_steps.windows(2).all(|w| w[0] < w[1]), "hull not ordered by step");

        let seeds: BTreeSet<usize> = seeds.into_iter().collect();
        let expected: BTreeSet<TestStepId> =
            expected_hull(&reads, &seeds).into_iter().map(|i| steps[i]).collect();
        prop_assert_eq!(unique, expected);
    }
}

#[test]
fn hull_of_a_two_cycle_contains_both_transitions_once() {
    let (kb, questions, steps) = graph_kb(&[vec![1], vec![0]]);
    let all: Vec<&StateTransition> = kb.state_transitions().collect();
    let seed = Condition::equal(questions[0], Value::choice("b"));
    let hull = supportive_transitions(&all, std::iter::once(&seed));
    let hull_steps: Vec<TestStepId> = hull.iter().map(|t| t.test_step()).collect();
    assert_eq!(hull_steps, steps);
}

#[test]
fn hull_ignores_transitions_that_write_unrelated_states() {
    let (kb, questions, steps) = graph_kb(&[vec![], vec![0], vec![2]]);
    let all: Vec<&StateTransition> = kb.state_transitions().collect();
    let seed = Condition::equal(questions[1], Value::choice("b"));
    let hull = supportive_transitions(&all, std::iter::once(&seed));
    let hull_steps: Vec<TestStepId> = hull.iter().map(|t| t.test_step()).collect();
    assert_eq!(hull_steps, vec![steps[0], steps[1]]);
}
