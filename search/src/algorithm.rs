//! The search algorithm contract.

use std::fmt;
use std::sync::Arc;

use triage_kernel::session::Session;

use crate::abort::AbortStrategy;
use crate::cost::CostFunction;
use crate::model::SearchModel;

/// Everything a search needs besides the model: a private copy of the
/// session and the planner's cost function and budget.
#[derive(Debug, Clone)]
pub struct SearchContext {
    session: Session,
    cost_function: Arc<dyn CostFunction>,
    abort_strategy: Arc<dyn AbortStrategy>,
}

impl SearchContext {
    /// Takes a search copy of `session`; the live session is never touched.
    #[must_use]
    pub fn new(
        session: &Session,
        cost_function: Arc<dyn CostFunction>,
        abort_strategy: Arc<dyn AbortStrategy>,
    ) -> Self {
        Self {
            session: session.search_copy(),
            cost_function,
            abort_strategy,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn cost_function(&self) -> &dyn CostFunction {
        self.cost_function.as_ref()
    }

    #[must_use]
    pub fn abort_strategy(&self) -> &dyn AbortStrategy {
        self.abort_strategy.as_ref()
    }

    #[must_use]
    pub fn with_abort_strategy(mut self, abort_strategy: Arc<dyn AbortStrategy>) -> Self {
        self.abort_strategy = abort_strategy;
        self
    }
}

/// Finds minimal paths for the targets of a model.
///
/// Implementations must:
/// - never use a step blocked in the model or contra-indicated in the session
/// - weight edges with the context's cost function
/// - explore only copies of the context session
/// - poll a monitor from the context's abort strategy once per expanded node
/// - on a budget abort, set `aborted` only if no target was reached
/// - stop promptly once `model.is_aborted()` is set from outside
pub trait SearchAlgorithm: Send + Sync + fmt::Debug {
    fn search(&self, ctx: &SearchContext, model: &mut SearchModel);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
