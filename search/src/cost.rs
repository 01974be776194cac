//! Edge weights: the cost of performing a test step in a given state.

use std::fmt;

use triage_kernel::knowledge::base::KnowledgeBase;
use triage_kernel::knowledge::terminology::{TestStep, TestStepId};
use triage_kernel::session::Session;

pub trait CostFunction: Send + Sync + fmt::Debug {
    /// Cost of performing `step` in the state of `session`.
    fn costs(&self, step: TestStepId, session: &Session) -> f64;

    /// State independent cost of `step`.
    fn static_costs(&self, step: TestStepId, knowledge_base: &KnowledgeBase) -> f64 {
        knowledge_base.test_step(step).map_or(0.0, TestStep::cost)
    }
}

/// Static cost plus every cost supplement whose condition holds, with the
/// supplement sum capped by the step's maximum supplement.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCostFunction;

impl CostFunction for DefaultCostFunction {
    fn costs(&self, step: TestStepId, session: &Session) -> f64 {
        let Some(test_step) = session.knowledge_base().test_step(step) else {
            return 0.0;
        };
        let supplement: f64 = test_step
            .cost_supplements()
            .iter()
            .filter(|s| s.condition.is_true(session))
            .map(|s| s.amount)
            .sum();
        let supplement = test_step
            .max_supplement()
            .map_or(supplement, |max| supplement.min(max));
        test_step.cost() + supplement
    }
}
