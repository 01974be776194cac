//! Shared fixtures for the triage benchmark suites.
//!
//! - [`ladder_session`]: a staged knowledge base whose minimal path grows
//!   with the number of rungs; exercises the searches directly.
//! - [`Workshop`]: a diagnostic interview over many findings and solutions;
//!   exercises the solver and the engine.

use std::sync::Arc;

use triage_kernel::knowledge::base::{KnowledgeBase, KnowledgeBaseBuilder};
use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::state_transition::{
    ConditionalValueSetter, StateTransition, ValueTransition,
};
use triage_kernel::knowledge::terminology::{Question, QuestionId, TestStep, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::Session;
use triage_planner::config::PlannerConfig;
use triage_planner::engine::InterviewEngine;
use triage_planner::strategic::{StrategicSupport, TableStrategicSupport};
use triage_search::abort::DefaultAbortStrategy;
use triage_search::algorithm::SearchContext;
use triage_search::cost::DefaultCostFunction;
use triage_search::model::SearchModel;
use triage_search::target::Target;

fn assign(question: QuestionId, value: &str) -> ValueTransition {
    ValueTransition::new(
        question,
        vec![ConditionalValueSetter::always(Value::choice(value))],
    )
}

fn add_transition(b: &mut KnowledgeBaseBuilder, transition: StateTransition) {
    b.add_state_transition(transition)
        .expect("benchmark state transition");
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// A session over a ladder with `rungs` stages, the probe step at its top
/// and a comfort step that is applicable everywhere.
///
/// Stage `i` can be climbed by `a{i}` (cost 1 + i % 3) or `b{i}`
/// (cost 3 - i % 3).
///
/// # Panics
///
/// Panics if the fixture knowledge base is rejected.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ladder_session(rungs: usize) -> (Session, TestStepId) {
    let mut b = KnowledgeBase::builder();
    let stages: Vec<String> = (0..=rungs).map(|i| format!("s{i}")).collect();
    let stage = b
        .add_question(
            Question::choice("stage", stages.iter().cloned()).with_init_value(Value::choice("s0")),
        )
        .expect("stage question");
    let light = b
        .add_question(
            Question::choice("light", ["off", "on"]).with_init_value(Value::choice("off")),
        )
        .expect("light question");
    let reading = b
        .add_question(Question::choice("reading", ["low", "high"]))
        .expect("reading question");

    for i in 0..rungs {
        let spread = (i % 3) as f64;
        for (name, cost) in [(format!("a{i}"), 1.0 + spread), (format!("b{i}"), 3.0 - spread)] {
            let step = b
                .add_test_step(TestStep::new(name, cost))
                .expect("rung step");
            add_transition(
                &mut b,
                StateTransition::new(
                    step,
                    Some(Condition::equal(stage, Value::choice(stages[i].as_str()))),
                    vec![assign(stage, &stages[i + 1])],
                ),
            );
        }
    }

    let probe = b
        .add_test_step(TestStep::new("probe", 1.0).with_questions([reading]))
        .expect("probe step");
    add_transition(
        &mut b,
        StateTransition::new(
            probe,
            Some(Condition::equal(stage, Value::choice(stages[rungs].as_str()))),
            Vec::new(),
        ),
    );

    let light_on = b
        .add_test_step(TestStep::new("light_on", 1.0).comfort(None))
        .expect("comfort step");
    add_transition(
        &mut b,
        StateTransition::new(
            light_on,
            Some(Condition::equal(light, Value::choice("off"))),
            vec![assign(light, "on")],
        ),
    );

    let kb = b.build().expect("ladder knowledge base");
    (Session::new(Arc::new(kb)), probe)
}

/// A search context with the default cost function and `max_steps` budget.
///
/// # Panics
///
/// Panics for a zero budget.
#[must_use]
pub fn search_context(session: &Session, max_steps: u64) -> SearchContext {
    let abort = DefaultAbortStrategy::new(
        max_steps,
        DefaultAbortStrategy::DEFAULT_INCREASING_FACTOR,
    )
    .expect("benchmark abort strategy");
    SearchContext::new(session, Arc::new(DefaultCostFunction), Arc::new(abort))
}

/// A fresh model with `target` as its only target.
#[must_use]
pub fn single_target_model(target: TestStepId) -> SearchModel {
    let mut model = SearchModel::new();
    model.add_target(Target::single(target));
    model.maximize_benefit(&[target], 1.0);
    model
}

// ---------------------------------------------------------------------------
// Workshop
// ---------------------------------------------------------------------------

/// A diagnostic knowledge base with one finding per check and a table of
/// solutions predicting them.
pub struct Workshop {
    pub kb: Arc<KnowledgeBase>,
    pub support: Arc<TableStrategicSupport>,
    /// Findings of every solution, in solution order.
    pub solutions: Vec<Vec<(QuestionId, Value)>>,
}

/// `checks` findings `f{k}`, each asked by `check{k}` (cost 1 + k % 3).
/// Every fourth check needs the panel opened first by `open{k / 4}`.
/// Solution `j` predicts `f{k} = pos` exactly when `(j + k) % 3 == 0`.
///
/// # Panics
///
/// Panics if the fixture knowledge base is rejected.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn workshop(checks: usize, solutions: usize) -> Workshop {
    let mut b = KnowledgeBase::builder();
    let findings: Vec<QuestionId> = (0..checks)
        .map(|k| {
            b.add_question(Question::choice(format!("f{k}"), ["neg", "pos"]))
                .expect("finding question")
        })
        .collect();

    let panels = checks.div_ceil(4);
    let mut panel_questions = Vec::with_capacity(panels);
    for p in 0..panels {
        let panel = b
            .add_question(
                Question::choice(format!("panel{p}"), ["closed", "open"])
                    .with_init_value(Value::choice("closed")),
            )
            .expect("panel question");
        let open = b
            .add_test_step(TestStep::new(format!("open{p}"), 2.0))
            .expect("open step");
        add_transition(
            &mut b,
            StateTransition::new(open, None, vec![assign(panel, "open")]),
        );
        panel_questions.push(panel);
    }

    for (k, finding) in findings.iter().enumerate() {
        let check = b
            .add_test_step(
                TestStep::new(format!("check{k}"), 1.0 + (k % 3) as f64).with_questions([*finding]),
            )
            .expect("check step");
        if k % 4 == 0 {
            add_transition(
                &mut b,
                StateTransition::new(
                    check,
                    Some(Condition::equal(panel_questions[k / 4], Value::choice("open"))),
                    Vec::new(),
                ),
            );
        }
    }
    let kb = Arc::new(b.build().expect("workshop knowledge base"));

    let mut table = TableStrategicSupport::new();
    let predictions: Vec<Vec<(QuestionId, Value)>> = (0..solutions)
        .map(|j| {
            findings
                .iter()
                .enumerate()
                .map(|(k, q)| {
                    let value = if (j + k) % 3 == 0 { "pos" } else { "neg" };
                    (*q, Value::choice(value))
                })
                .collect()
        })
        .collect();
    for (j, prediction) in predictions.iter().enumerate() {
        table.add_solution(format!("sol{j}"), prediction.iter().cloned());
    }

    Workshop {
        kb,
        support: Arc::new(table),
        solutions: predictions,
    }
}

impl Workshop {
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn engine(&self, config: &PlannerConfig) -> InterviewEngine {
        let support: Arc<dyn StrategicSupport> = self.support.clone();
        InterviewEngine::from_config(Arc::clone(&self.kb), config, [support])
            .expect("benchmark planner configuration")
    }

    /// Runs an interview answering as solution `j` would; returns the
    /// number of frames.
    ///
    /// # Panics
    ///
    /// Panics if the interview does not end within one frame per check.
    #[must_use]
    pub fn interview(&self, config: &PlannerConfig, j: usize) -> usize {
        let mut engine = self.engine(config);
        engine.start();
        let findings = &self.solutions[j];
        let mut frames = 1;
        while let Some(current) = engine.current_step() {
            assert!(frames <= findings.len() + 1, "interview did not finish");
            let questions = self
                .kb
                .test_step(current)
                .map(|s| s.questions().to_vec())
                .unwrap_or_default();
            let answers: Vec<(QuestionId, Value)> = findings
                .iter()
                .filter(|(q, _)| questions.contains(q))
                .cloned()
                .collect();
            engine.answer_all(answers);
            frames += 1;
        }
        frames
    }
}
