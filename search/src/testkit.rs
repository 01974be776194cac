//! Workshop knowledge base shared by the unit tests of this crate.
//!
//! - `open_door` (2) / `remove_panel` (10): door := open
//! - `power_off` (1): power := off
//! - `check_fuse` (5): needs door = open and power = off
//! - `check_lamp` (3): needs power = on
//! - `turn_on_light` (1): comfort step, needs light = off, sets light := on
//! - `check_seal` (1): needs the final question seal = broken, which nothing sets

use std::sync::Arc;

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::condition::Condition;
use triage_kernel::knowledge::state_transition::{
    ConditionalValueSetter, StateTransition, ValueTransition,
};
use triage_kernel::knowledge::terminology::{Question, QuestionId, TestStep, TestStepId};
use triage_kernel::knowledge::value::Value;
use triage_kernel::session::Session;

use crate::abort::{AbortStrategy, DefaultAbortStrategy};
use crate::algorithm::SearchContext;
use crate::cost::DefaultCostFunction;
use crate::model::SearchModel;
use crate::target::Target;

pub(crate) struct Workshop {
    pub session: Session,
    pub light: QuestionId,
    pub open_door: TestStepId,
    pub remove_panel: TestStepId,
    pub power_off: TestStepId,
    pub check_fuse: TestStepId,
    pub check_lamp: TestStepId,
    pub turn_on_light: TestStepId,
    pub check_seal: TestStepId,
}

fn set(question: QuestionId, value: &str) -> ValueTransition {
    ValueTransition::new(
        question,
        vec![ConditionalValueSetter::always(Value::choice(value))],
    )
}

pub(crate) fn workshop_with_comfort(comfort: Option<Condition>) -> Workshop {
    let mut b = KnowledgeBase::builder();
    let door = b
        .add_question(Question::choice("door", ["closed", "open"]).with_init_value(Value::choice("closed")))
        .unwrap();
    let power = b
        .add_question(Question::choice("power", ["on", "off"]).with_init_value(Value::choice("on")))
        .unwrap();
    let light = b
        .add_question(Question::choice("light", ["off", "on"]).with_init_value(Value::choice("off")))
        .unwrap();
    let seal = b
        .add_question(
            Question::choice("seal", ["intact", "broken"])
                .final_question()
                .with_init_value(Value::choice("intact")),
        )
        .unwrap();
    let fuse = b.add_question(Question::choice("fuse", ["ok", "broken"])).unwrap();
    let lamp = b.add_question(Question::choice("lamp", ["lit", "dark"])).unwrap();

    let open_door = b.add_test_step(TestStep::new("open_door", 2.0)).unwrap();
    let remove_panel = b.add_test_step(TestStep::new("remove_panel", 10.0)).unwrap();
    let power_off = b.add_test_step(TestStep::new("power_off", 1.0)).unwrap();
    let check_fuse = b
        .add_test_step(TestStep::new("check_fuse", 5.0).with_questions([fuse]))
        .unwrap();
    let check_lamp = b
        .add_test_step(TestStep::new("check_lamp", 3.0).with_questions([lamp]))
        .unwrap();
    let turn_on_light = b
        .add_test_step(TestStep::new("turn_on_light", 1.0).comfort(comfort))
        .unwrap();
    let check_seal = b.add_test_step(TestStep::new("check_seal", 1.0)).unwrap();

    let eq = |q, v: &str| Condition::equal(q, Value::choice(v));
    for t in [
        StateTransition::new(open_door, None, vec![set(door, "open")]),
        StateTransition::new(remove_panel, None, vec![set(door, "open")]),
        StateTransition::new(power_off, None, vec![set(power, "off")]),
        StateTransition::new(
            check_fuse,
            Some(Condition::and([eq(door, "open"), eq(power, "off")])),
            Vec::new(),
        ),
        StateTransition::new(check_lamp, Some(eq(power, "on")), Vec::new()),
        StateTransition::new(turn_on_light, Some(eq(light, "off")), vec![set(light, "on")]),
        StateTransition::new(check_seal, Some(eq(seal, "broken")), Vec::new()),
    ] {
        b.add_state_transition(t).unwrap();
    }

    Workshop {
        session: Session::new(Arc::new(b.build().unwrap())),
        light,
        open_door,
        remove_panel,
        power_off,
        check_fuse,
        check_lamp,
        turn_on_light,
        check_seal,
    }
}

pub(crate) fn workshop() -> Workshop {
    workshop_with_comfort(None)
}

pub(crate) fn context(session: &Session) -> SearchContext {
    context_with(session, Arc::new(DefaultAbortStrategy::default()))
}

pub(crate) fn context_with(session: &Session, abort: Arc<dyn AbortStrategy>) -> SearchContext {
    SearchContext::new(session, Arc::new(DefaultCostFunction), abort)
}

/// One single-step target per step, benefit 1.
pub(crate) fn model_for(steps: &[TestStepId]) -> SearchModel {
    let mut model = SearchModel::new();
    for step in steps {
        model.add_target(Target::single(*step));
        model.maximize_benefit(&[*step], 1.0);
    }
    model
}

pub(crate) fn min_costs(model: &SearchModel, step: TestStepId) -> Option<f64> {
    model
        .target(&[step])
        .and_then(Target::min_path)
        .map(crate::path::Path::costs)
}
