//! Composite searches over several delegate algorithms.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::algorithm::{SearchAlgorithm, SearchContext};
use crate::error::SearchError;
use crate::executor::{panic_message, IterableExecutor};
use crate::model::SearchModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiSearchMode {
    /// Delegates run one after another on the model until one finishes
    /// without aborting.
    Continued,
    /// Delegates run one after another, each on a fresh clone that is
    /// merged back, until one finishes without aborting.
    Merged,
    /// Delegates race on clones in the worker pool; the first one that
    /// finishes without aborting cancels the rest.
    Parallel,
}

#[derive(Debug, Clone)]
pub struct MultiSearchAlgorithm {
    mode: MultiSearchMode,
    delegates: Vec<Arc<dyn SearchAlgorithm>>,
}

impl MultiSearchAlgorithm {
    /// # Errors
    ///
    /// Returns [`SearchError::NoDelegates`] for an empty delegate list.
    pub fn new(
        mode: MultiSearchMode,
        delegates: Vec<Arc<dyn SearchAlgorithm>>,
    ) -> Result<Self, SearchError> {
        if delegates.is_empty() {
            return Err(SearchError::NoDelegates);
        }
        Ok(Self { mode, delegates })
    }

    #[must_use]
    pub fn mode(&self) -> MultiSearchMode {
        self.mode
    }

    #[must_use]
    pub fn delegates(&self) -> &[Arc<dyn SearchAlgorithm>] {
        &self.delegates
    }

    fn search_continued(&self, ctx: &SearchContext, model: &mut SearchModel) {
        for delegate in &self.delegates {
            // A previous delegate's abort must not stop the next one.
            model.set_abort(false);
            let run = catch_unwind(AssertUnwindSafe(|| delegate.search(ctx, model)));
            if let Err(payload) = run {
                warn!(
                    delegate = delegate.name(),
                    panic = %panic_message(payload.as_ref()),
                    "delegate search panicked"
                );
                model.set_abort(true);
                continue;
            }
            if !model.is_aborted() {
                debug!(delegate = delegate.name(), "continued search finished");
                return;
            }
        }
        model.set_abort(true);
    }

    fn search_merged(&self, ctx: &SearchContext, model: &mut SearchModel) {
        for delegate in &self.delegates {
            let mut clone = model.clone();
            let run = catch_unwind(AssertUnwindSafe(|| delegate.search(ctx, &mut clone)));
            if let Err(payload) = run {
                warn!(
                    delegate = delegate.name(),
                    panic = %panic_message(payload.as_ref()),
                    "delegate search panicked"
                );
                continue;
            }
            model.merge(&clone);
            model.add_calculation_steps(clone.calculation_steps());
            model.add_calculation_time(clone.calculation_time());
            if !clone.is_aborted() {
                debug!(delegate = delegate.name(), "merged search finished");
                model.set_abort(false);
                return;
            }
        }
        model.set_abort(true);
    }

    fn search_parallel(&self, ctx: &SearchContext, model: &mut SearchModel) {
        let mut executor = IterableExecutor::new();
        let mut cancel = Vec::with_capacity(self.delegates.len());
        for delegate in &self.delegates {
            let mut clone = model.clone();
            cancel.push(clone.abort_handle());
            let delegate = Arc::clone(delegate);
            let ctx = ctx.clone();
            executor.submit(move || {
                delegate.search(&ctx, &mut clone);
                clone
            });
        }

        let mut success = false;
        for done in executor {
            match done.outcome {
                Ok(clone) => {
                    let finished = !clone.is_aborted();
                    model.merge(&clone);
                    model.add_calculation_steps(clone.calculation_steps());
                    if finished && !success {
                        success = true;
                        debug!(
                            delegate = self.delegates[done.submission_index].name(),
                            "parallel search winner; cancelling the rest"
                        );
                        for handle in &cancel {
                            handle.abort();
                        }
                    }
                }
                Err(failure) => {
                    warn!(
                        delegate = self.delegates[done.submission_index].name(),
                        %failure,
                        "parallel delegate failed"
                    );
                }
            }
        }
        model.set_abort(!success);
    }
}

impl SearchAlgorithm for MultiSearchAlgorithm {
    fn search(&self, ctx: &SearchContext, model: &mut SearchModel) {
        match self.mode {
            MultiSearchMode::Continued => self.search_continued(ctx, model),
            MultiSearchMode::Merged => self.search_merged(ctx, model),
            MultiSearchMode::Parallel => self.search_parallel(ctx, model),
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            MultiSearchMode::Continued => "multi-continued",
            MultiSearchMode::Merged => "multi-merged",
            MultiSearchMode::Parallel => "multi-parallel",
        }
    }
}
