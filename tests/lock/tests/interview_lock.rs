//! End-to-end interview lock tests over the pump fixture.
//!
//! Proves:
//! 1. A full replan picks the best benefit/cost target and the interview
//!    walks its path, replanning until one solution is left
//! 2. A contra-indicated step leaves the path and never returns to it
//! 3. Expert mode selections, inspection and recalculation
//! 4. A configuration file drives the same interview with another search

use std::io::Write;

use lock_tests::{pump, pump_engine, run_interview};
use triage_kernel::knowledge::terminology::TestStepId;
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::indication::{Indication, IndicationSource};
use triage_kernel::session::protocol::ProtocolEntry;
use triage_planner::config::{PlannerConfig, SearchStrategy};
use triage_planner::logging;
use triage_planner::solver::{PlanningOutcome, SkipReason};
use triage_search::target::Target;

fn activated_target(outcome: &PlanningOutcome) -> Option<&[TestStepId]> {
    match outcome {
        PlanningOutcome::PathActivated { target, .. } => Some(target),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// 1. Full interview
// ---------------------------------------------------------------------------

#[test]
fn interview_narrows_down_to_wear() {
    logging::init();
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());

    let frame = engine.start();
    // listen: 0.92 bits for 1; inspect_impeller: 1.58 bits for 5
    match &frame.replan {
        PlanningOutcome::PathActivated { target, path } => {
            assert_eq!(target, &[p.listen]);
            assert_eq!(path.steps(), &[p.listen]);
        }
        other => panic!("expected the listen path, got {other:?}"),
    }
    assert_eq!(engine.current_step(), Some(p.listen));

    let frame = engine.answer(p.hum, Value::choice("yes"));
    match &frame.replan {
        PlanningOutcome::PathActivated { target, path } => {
            assert_eq!(target, &[p.inspect_impeller]);
            assert_eq!(path.steps(), &[p.open_cover, p.inspect_impeller]);
        }
        other => panic!("expected the impeller path, got {other:?}"),
    }
    // open_cover asks nothing, so its transition fired right away
    assert_eq!(engine.session().value(p.cover), Some(&Value::choice("open")));
    assert_eq!(engine.current_step(), Some(p.inspect_impeller));

    let frame = engine.answer(p.impeller, Value::choice("worn"));
    assert_eq!(frame.replan, PlanningOutcome::Skipped(SkipReason::NoBenefit));
    assert_eq!(engine.current_step(), None);
    assert_eq!(engine.driver_state().last_fired(), Some(p.inspect_impeller));

    let paths = engine
        .session()
        .protocol()
        .entries()
        .iter()
        .filter(|e| matches!(e, ProtocolEntry::CalculatedPath { .. }))
        .count();
    assert_eq!(paths, 2);
}

#[test]
fn every_solution_ends_the_interview() {
    let p = pump();
    for (solution, frames) in [("motor", 2), ("bearing", 3), ("wear", 3)] {
        let mut engine = pump_engine(&p, &PlannerConfig::default());
        let outcomes = run_interview(&mut engine, p.findings(solution));
        assert_eq!(outcomes.len(), frames, "{solution}: {outcomes:?}");
        assert_eq!(
            outcomes.last(),
            Some(&PlanningOutcome::Skipped(SkipReason::NoBenefit)),
            "{solution}"
        );
    }
}

#[test]
fn unanswered_path_step_postpones_replanning() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    engine.start();
    // power is no question of listen, so listen stays pending
    let frame = engine.answer(p.power, Value::choice("off"));
    assert_eq!(frame.replan, PlanningOutcome::Skipped(SkipReason::PendingAgenda));
    assert_eq!(engine.current_step(), Some(p.listen));
}

// ---------------------------------------------------------------------------
// 2. Contra-indication
// ---------------------------------------------------------------------------

#[test]
fn contra_indicated_step_leaves_the_plan() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    engine.start();

    let frame = engine.set_indication(p.listen, IndicationSource::Rule, Indication::ContraIndicated);

    match &frame.replan {
        PlanningOutcome::PathActivated { target, path } => {
            assert_eq!(target, &[p.inspect_impeller]);
            assert!(!path.contains(p.listen));
        }
        other => panic!("expected a path around listen, got {other:?}"),
    }
    let blocked = engine
        .planner()
        .search_model()
        .and_then(|m| m.target(&[p.listen]))
        .is_some_and(|t| !t.is_reached());
    assert!(blocked);
    assert!(engine
        .planner()
        .discriminating_targets()
        .iter()
        .all(|t| t.steps() != [p.listen]));
}

// ---------------------------------------------------------------------------
// 3. Expert mode
// ---------------------------------------------------------------------------

#[test]
fn selected_step_is_reached_through_its_preparation() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    engine.start();

    let outcome = engine.expert_mode().select_step(p.test_fuse);
    match &outcome {
        PlanningOutcome::PathActivated { target, path } => {
            assert_eq!(target, &[p.test_fuse]);
            assert_eq!(path.steps(), &[p.isolate, p.test_fuse]);
        }
        other => panic!("expected the fuse path, got {other:?}"),
    }
    assert_eq!(engine.current_step(), Some(p.test_fuse));
    assert_eq!(engine.session().value(p.power), Some(&Value::choice("off")));
    assert!(engine.session().protocol().entries().iter().any(|e| matches!(
        e,
        ProtocolEntry::ManualTargetSelection { target, .. } if target == &["test_fuse"]
    )));

    // the fuse rules out the motor; the impeller separates the rest
    let frame = engine.answer(p.fuse, Value::choice("ok"));
    assert_eq!(activated_target(&frame.replan), Some(&[p.inspect_impeller][..]));
    assert_eq!(engine.planner().unreached_target(), None);
}

#[test]
fn alternatives_exclude_the_current_target() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    engine.start();
    let expert = engine.expert_mode();

    assert_eq!(expert.current_target().map(Target::steps), Some(&[p.listen][..]));
    let alternatives: Vec<Vec<_>> = expert
        .alternative_targets(false)
        .iter()
        .map(|t| t.steps().to_vec())
        .collect();
    assert_eq!(alternatives, vec![vec![p.inspect_impeller], vec![p.test_fuse]]);

    let calculated: Vec<Vec<_>> = expert
        .calculated_targets(true)
        .iter()
        .map(|t| t.steps().to_vec())
        .collect();
    assert_eq!(calculated[0], vec![p.listen]);
    assert_eq!(calculated.len(), 3);
}

#[test]
fn recalculation_restores_the_abort_strategy() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    assert_eq!(
        engine.expert_mode().recalculate().unwrap(),
        PlanningOutcome::Skipped(SkipReason::NoSearchModel)
    );
    engine.start();

    let outcome = engine.expert_mode().recalculate().unwrap();

    assert_eq!(activated_target(&outcome), Some(&[p.listen][..]));
    assert_eq!(engine.solver().abort_strategy().max_steps(), Some(100_000));
}

#[test]
fn leaving_manual_mode_replans() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    assert_eq!(engine.expert_mode().set_manual_mode(true), None);
    assert_eq!(
        engine.start().replan,
        PlanningOutcome::Skipped(SkipReason::ManualMode)
    );

    let outcome = engine.expert_mode().set_manual_mode(false);

    assert_eq!(outcome.as_ref().and_then(activated_target), Some(&[p.listen][..]));
    assert_eq!(engine.current_step(), Some(p.listen));
}

#[test]
fn unreachable_selection_is_reported_to_the_caller() {
    let p = pump();
    let mut engine = pump_engine(&p, &PlannerConfig::default());
    engine.start();
    engine.set_indication(p.test_fuse, IndicationSource::User, Indication::ContraIndicated);

    let outcome = engine.expert_mode().select_step(p.test_fuse);

    assert_eq!(outcome, PlanningOutcome::NoPath);
    assert_eq!(
        engine.answer(p.hum, Value::choice("yes")).replan,
        PlanningOutcome::Skipped(SkipReason::AbortedManualTarget)
    );
    engine.expert_mode().reset_after_abort();
    assert!(engine.start().replan.is_activated());
}

// ---------------------------------------------------------------------------
// 4. Configuration file
// ---------------------------------------------------------------------------

#[test]
fn configuration_file_selects_the_search() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"{{
            "search": {{"strategy": "parallel", "comfort_steps": false}},
            "abort": {{"max_steps": 500, "increasing_factor": 2.0}},
            "watched_steps": ["inspect_impeller"]
        }}"#
    )
    .expect("write config");
    let config = PlannerConfig::from_path(file.path()).expect("load config");
    assert_eq!(config.search.strategy, SearchStrategy::Parallel);
    assert_eq!(config.search_algorithm().unwrap().name(), "multi-parallel");

    let p = pump();
    let mut engine = pump_engine(&p, &config);
    let outcomes = run_interview(&mut engine, p.findings("wear"));

    let targets: Vec<_> = outcomes.iter().filter_map(activated_target).collect();
    assert_eq!(targets, vec![&[p.listen][..], &[p.inspect_impeller][..]]);
    assert!(engine.session().protocol().entries().iter().any(|e| matches!(
        e,
        ProtocolEntry::CalculatedTarget { target, .. } if target == &["inspect_impeller"]
    )));
}
