//! Search model lock tests.
//!
//! Proves:
//! 1. Merging a model with an unchanged clone of itself changes nothing
//! 2. Target benefits only grow
//! 3. The best target maximizes benefit per cost, ties going to the target
//!    registered first, both on a hand-built model and after a real search

use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::terminology::{Question, TestStep, TestStepId};
use triage_kernel::session::Session;
use triage_search::abort::DefaultAbortStrategy;
use triage_search::algorithm::{SearchAlgorithm, SearchContext};
use triage_search::astar::AStarSearch;
use triage_search::blocking::BlockingReason;
use triage_search::cost::DefaultCostFunction;
use triage_search::model::SearchModel;
use triage_search::path::Path;
use triage_search::target::Target;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TargetDraft {
    step: u32,
    benefit: f64,
    path_costs: Option<Vec<u8>>,
    blocked: bool,
}

fn arb_target() -> impl Strategy<Value = TargetDraft> {
    (
        0u32..12,
        0.0f64..50.0,
        prop::option::of(prop::collection::vec(1u8..10, 0..4)),
        any::<bool>(),
    )
        .prop_map(|(step, benefit, path_costs, blocked)| TargetDraft {
            step,
            benefit,
            path_costs,
            blocked,
        })
}

fn build_model(drafts: &[TargetDraft]) -> SearchModel {
    let mut model = SearchModel::new();
    for draft in drafts {
        let step = TestStepId(draft.step);
        model.add_target(Target::single(step));
        model.maximize_benefit(&[step], draft.benefit);
        if let Some(costs) = &draft.path_costs {
            // prefix steps are numbered above the target range
            let prefix = costs
                .iter()
                .enumerate()
                .map(|(i, c)| (TestStepId(100 + u32::try_from(i).unwrap()), f64::from(*c)));
            let path = Path::from_steps(prefix.chain(std::iter::once((step, 1.0))));
            model.offer_path(&path);
        }
        if draft.blocked {
            model.block_target(&[step], BlockingReason::CannotReach);
        }
    }
    model
}

fn snapshot(model: &SearchModel) -> Vec<Target> {
    model.targets().cloned().collect()
}

// ---------------------------------------------------------------------------
// 1. Merge idempotence
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn merge_with_own_clone_is_a_no_op(drafts in prop::collection::vec(arb_target(), 0..10)) {
        let mut model = build_model(&drafts);
        let before = snapshot(&model);
        let blocked_before: Vec<bool> = before
            .iter()
            .map(|t| model.is_target_blocked(t.steps()))
            .collect();
        let best_before = model.best_target().map(|t| t.steps().to_vec());

        let copy = model.clone();
        model.merge(&copy);

        prop_assert_eq!(snapshot(&model), before.clone());
        let blocked_after: Vec<bool> = before
            .iter()
            .map(|t| model.is_target_blocked(t.steps()))
            .collect();
        prop_assert_eq!(blocked_after, blocked_before);
        prop_assert_eq!(model.best_target().map(|t| t.steps().to_vec()), best_before);
    }
}

// ---------------------------------------------------------------------------
// 2. Monotone benefit
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn benefit_never_decreases(values in prop::collection::vec(-20.0f64..100.0, 1..20)) {
        let step = TestStepId(0);
        let mut model = SearchModel::new();
        model.add_target(Target::single(step));
        for value in values {
            let previous = model.target(&[step]).map(Target::benefit).unwrap();
            model.maximize_benefit(&[step], value);
            let current = model.target(&[step]).map(Target::benefit).unwrap();
            prop_assert_eq!(current, previous.max(value));
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Best target tie-break
// ---------------------------------------------------------------------------

#[test]
fn equal_ratio_goes_to_first_registered_target() {
    let t1 = TestStepId(1);
    let t2 = TestStepId(2);
    let mut model = SearchModel::new();
    model.add_target(Target::single(t1));
    model.add_target(Target::single(t2));
    model.maximize_benefit(&[t1], 10.0);
    model.maximize_benefit(&[t2], 5.0);
    model.offer_path(&Path::from_steps([(t1, 2.0)]));
    model.offer_path(&Path::from_steps([(t2, 1.0)]));

    assert_eq!(model.best_target().map(Target::steps), Some(&[t1][..]));
}

#[test]
fn higher_ratio_beats_registration_order() {
    let t1 = TestStepId(1);
    let t2 = TestStepId(2);
    let mut model = SearchModel::new();
    model.add_target(Target::single(t1));
    model.add_target(Target::single(t2));
    model.maximize_benefit(&[t1], 10.0);
    model.maximize_benefit(&[t2], 6.0);
    model.offer_path(&Path::from_steps([(t1, 2.0)]));
    model.offer_path(&Path::from_steps([(t2, 1.0)]));

    assert_eq!(model.best_target().map(Target::steps), Some(&[t2][..]));
}

/// Two free-standing steps costing 2 and 1; benefits 10 and 5.
fn tie_session() -> (Session, TestStepId, TestStepId) {
    let mut b = KnowledgeBase::builder();
    let q1 = b.add_question(Question::choice("first", ["a", "b"])).unwrap();
    let q2 = b.add_question(Question::choice("second", ["a", "b"])).unwrap();
    let s1 = b
        .add_test_step(TestStep::new("expensive", 2.0).with_questions([q1]))
        .unwrap();
    let s2 = b
        .add_test_step(TestStep::new("cheap", 1.0).with_questions([q2]))
        .unwrap();
    (Session::new(Arc::new(b.build().unwrap())), s1, s2)
}

fn search(session: &Session, order: [(TestStepId, f64); 2]) -> SearchModel {
    let ctx = SearchContext::new(
        session,
        Arc::new(DefaultCostFunction),
        Arc::new(DefaultAbortStrategy::default()),
    );
    let mut model = SearchModel::new();
    for (step, benefit) in order {
        model.add_target(Target::single(step));
        model.maximize_benefit(&[step], benefit);
    }
    AStarSearch.search(&ctx, &mut model);
    model
}

#[test]
fn searched_tie_goes_to_first_registered_target() {
    let (session, s1, s2) = tie_session();

    let model = search(&session, [(s1, 10.0), (s2, 5.0)]);
    assert!(!model.is_aborted());
    assert_eq!(model.best_target().map(Target::steps), Some(&[s1][..]));
    assert_eq!(model.best_path().map(Path::costs), Some(2.0));

    let model = search(&session, [(s2, 5.0), (s1, 10.0)]);
    assert_eq!(model.best_target().map(Target::steps), Some(&[s2][..]));
}
