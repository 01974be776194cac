//! Shared fixtures for the cross-crate lock tests.
//!
//! - [`pump`]: a small repair interview with three competing solutions,
//!   used by the end-to-end engine tests and the `interview_fixture` binary.
//! - [`ladder`]: a staged knowledge base with two alternative steps per
//!   stage, used by the search properties.
//!
//! Fixture construction panics on malformed knowledge; that is a bug in the
//! fixture, never in the code under test.

use std::collections::BTreeMap;
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
use triage_planner::solver::PlanningOutcome;
use triage_planner::strategic::{StrategicSupport, TableStrategicSupport};

fn assign(question: QuestionId, value: &str) -> ValueTransition {
    ValueTransition::new(
        question,
        vec![ConditionalValueSetter::always(Value::choice(value))],
    )
}

fn choice_question(b: &mut KnowledgeBaseBuilder, question: Question) -> QuestionId {
    b.add_question(question).expect("fixture question")
}

fn step(b: &mut KnowledgeBaseBuilder, step: TestStep) -> TestStepId {
    b.add_test_step(step).expect("fixture test step")
}

fn transition(b: &mut KnowledgeBaseBuilder, transition: StateTransition) {
    b.add_state_transition(transition)
        .expect("fixture state transition");
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

pub struct Pump {
    pub kb: Arc<KnowledgeBase>,
    pub cover: QuestionId,
    pub power: QuestionId,
    pub hum: QuestionId,
    pub fuse: QuestionId,
    pub impeller: QuestionId,
    /// cost 1, asks `hum`
    pub listen: TestStepId,
    /// cost 2, cover := open
    pub open_cover: TestStepId,
    /// cost 1, power := off
    pub isolate: TestStepId,
    /// cost 2, asks `fuse`, needs power = off
    pub test_fuse: TestStepId,
    /// cost 3, asks `impeller`, needs cover = open
    pub inspect_impeller: TestStepId,
    pub support: Arc<TableStrategicSupport>,
    solutions: BTreeMap<&'static str, Vec<(QuestionId, Value)>>,
}

impl Pump {
    /// The findings `solution` predicts, in question order.
    ///
    /// # Panics
    ///
    /// Panics for a solution name the fixture does not define.
    #[must_use]
    pub fn findings(&self, solution: &str) -> &[(QuestionId, Value)] {
        self.solutions
            .get(solution)
            .unwrap_or_else(|| panic!("unknown pump solution {solution}"))
    }
}

/// Solutions `motor` (hum = no, fuse = blown), `bearing` (hum = yes,
/// fuse = ok, impeller = ok) and `wear` (hum = yes, fuse = ok,
/// impeller = worn).
#[must_use]
pub fn pump() -> Pump {
    let mut b = KnowledgeBase::builder();
    let cover = choice_question(
        &mut b,
        Question::choice("cover", ["closed", "open"]).with_init_value(Value::choice("closed")),
    );
    let power = choice_question(
        &mut b,
        Question::choice("power", ["on", "off"]).with_init_value(Value::choice("on")),
    );
    let hum = choice_question(&mut b, Question::choice("hum", ["no", "yes"]));
    let fuse = choice_question(&mut b, Question::choice("fuse", ["ok", "blown"]));
    let impeller = choice_question(&mut b, Question::choice("impeller", ["ok", "worn"]));

    let listen = step(&mut b, TestStep::new("listen", 1.0).with_questions([hum]));
    let open_cover = step(&mut b, TestStep::new("open_cover", 2.0));
    let isolate = step(&mut b, TestStep::new("isolate", 1.0));
    let test_fuse = step(&mut b, TestStep::new("test_fuse", 2.0).with_questions([fuse]));
    let inspect_impeller = step(
        &mut b,
        TestStep::new("inspect_impeller", 3.0).with_questions([impeller]),
    );

    transition(
        &mut b,
        StateTransition::new(open_cover, None, vec![assign(cover, "open")]),
    );
    transition(
        &mut b,
        StateTransition::new(isolate, None, vec![assign(power, "off")]),
    );
    transition(
        &mut b,
        StateTransition::new(
            test_fuse,
            Some(Condition::equal(power, Value::choice("off"))),
            Vec::new(),
        ),
    );
    transition(
        &mut b,
        StateTransition::new(
            inspect_impeller,
            Some(Condition::equal(cover, Value::choice("open"))),
            Vec::new(),
        ),
    );
    let kb = Arc::new(b.build().expect("pump knowledge base"));

    let yes = || Value::choice("yes");
    let ok = || Value::choice("ok");
    let solutions = BTreeMap::from([
        (
            "motor",
            vec![(hum, Value::choice("no")), (fuse, Value::choice("blown"))],
        ),
        ("bearing", vec![(hum, yes()), (fuse, ok()), (impeller, ok())]),
        (
            "wear",
            vec![(hum, yes()), (fuse, ok()), (impeller, Value::choice("worn"))],
        ),
    ]);
    let mut table = TableStrategicSupport::new();
    for name in ["motor", "bearing", "wear"] {
        table.add_solution(name, solutions[name].iter().cloned());
    }

    Pump {
        kb,
        cover,
        power,
        hum,
        fuse,
        impeller,
        listen,
        open_cover,
        isolate,
        test_fuse,
        inspect_impeller,
        support: Arc::new(table),
        solutions,
    }
}

/// An engine over `pump` with the table support and `config`.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn pump_engine(pump: &Pump, config: &PlannerConfig) -> InterviewEngine {
    let support: Arc<dyn StrategicSupport> = pump.support.clone();
    InterviewEngine::from_config(Arc::clone(&pump.kb), config, [support])
        .expect("valid planner configuration")
}

/// Runs a whole interview: starts the engine, then answers the questions of
/// the current step from `findings` until the planner has nothing left to
/// propose. Unpredicted questions get their first choice. Returns the
/// replan outcome of every frame.
///
/// # Panics
///
/// Panics if the interview does not finish within 16 frames.
pub fn run_interview(
    engine: &mut InterviewEngine,
    findings: &[(QuestionId, Value)],
) -> Vec<PlanningOutcome> {
    let mut outcomes = vec![engine.start().replan];
    for _ in 0..16 {
        let Some(current) = engine.current_step() else {
            return outcomes;
        };
        let kb = Arc::clone(engine.session().knowledge_base_arc());
        let questions = kb
            .test_step(current)
            .map(|s| s.questions().to_vec())
            .unwrap_or_default();
        let answers: Vec<(QuestionId, Value)> = questions
            .into_iter()
            .filter(|q| !engine.session().is_answered(*q))
            .map(|q| {
                let value = findings
                    .iter()
                    .find(|(question, _)| *question == q)
                    .map(|(_, v)| v.clone())
                    .or_else(|| kb.question(q).and_then(Question::expected_value))
                    .unwrap_or_else(|| panic!("no answer for {}", kb.question_name(q)));
                (q, value)
            })
            .collect();
        outcomes.push(engine.answer_all(answers).replan);
    }
    panic!("interview did not finish: {outcomes:?}");
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

pub struct Ladder {
    pub session: Session,
    pub stage: QuestionId,
    pub light: QuestionId,
    /// The two alternatives `a{i}` / `b{i}` moving stage `s{i}` to `s{i+1}`.
    pub rungs: Vec<(TestStepId, TestStepId)>,
    /// Asks `reading`; needs the last stage.
    pub probe: TestStepId,
    /// Comfort step switching the light on, if requested.
    pub light_on: Option<TestStepId>,
}

impl Ladder {
    /// Follows `choices` (false = `a`, true = `b`) up the ladder and ends
    /// with the probe.
    #[must_use]
    pub fn path_steps(&self, choices: &[bool]) -> Vec<TestStepId> {
        self.rungs
            .iter()
            .zip(choices)
            .map(|(&(a, b), &pick_b)| if pick_b { b } else { a })
            .chain(std::iter::once(self.probe))
            .collect()
    }
}

/// A ladder with one rung per entry of `costs` (cost of `a{i}`, cost of
/// `b{i}`) and a probe costing `probe_cost`.
///
/// # Panics
///
/// Panics if the fixture knowledge base is rejected.
#[must_use]
pub fn ladder(costs: &[(f64, f64)], probe_cost: f64, comfort: bool) -> Ladder {
    let mut b = KnowledgeBase::builder();
    let stages: Vec<String> = (0..=costs.len()).map(|i| format!("s{i}")).collect();
    let stage = choice_question(
        &mut b,
        Question::choice("stage", stages.iter().cloned()).with_init_value(Value::choice("s0")),
    );
    let light = choice_question(
        &mut b,
        Question::choice("light", ["off", "on"]).with_init_value(Value::choice("off")),
    );
    let reading = choice_question(&mut b, Question::choice("reading", ["low", "high"]));

    let mut rungs = Vec::with_capacity(costs.len());
    for (i, &(cost_a, cost_b)) in costs.iter().enumerate() {
        let a = step(&mut b, TestStep::new(format!("a{i}"), cost_a));
        let alt = step(&mut b, TestStep::new(format!("b{i}"), cost_b));
        for s in [a, alt] {
            transition(
                &mut b,
                StateTransition::new(
                    s,
                    Some(Condition::equal(stage, Value::choice(stages[i].as_str()))),
                    vec![assign(stage, &stages[i + 1])],
                ),
            );
        }
        rungs.push((a, alt));
    }

    let probe = step(
        &mut b,
        TestStep::new("probe", probe_cost).with_questions([reading]),
    );
    transition(
        &mut b,
        StateTransition::new(
            probe,
            Some(Condition::equal(
                stage,
                Value::choice(stages[costs.len()].as_str()),
            )),
            Vec::new(),
        ),
    );

    let light_on = comfort.then(|| {
        let s = step(&mut b, TestStep::new("light_on", 1.0).comfort(None));
        transition(
            &mut b,
            StateTransition::new(
                s,
                Some(Condition::equal(light, Value::choice("off"))),
                vec![assign(light, "on")],
            ),
        );
        s
    });

    Ladder {
        session: Session::new(Arc::new(b.build().expect("ladder knowledge base"))),
        stage,
        light,
        rungs,
        probe,
        light_on,
    }
}
