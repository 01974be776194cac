//! Cost-bounded iterative deepening.
//!
//! Each iteration runs a depth-first search that prunes paths costlier than
//! the current bound, then raises the bound to the cheapest pruned cost.
//! Memory stays proportional to the path length; states are only
//! deduplicated along the current path. Paths are never longer than
//! `max_depth`; a run that cut a branch there and left a target unreached
//! aborts, since its result proves nothing about that target.

use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::time::Instant;

use tracing::debug;
use triage_kernel::proof::hash::ContentHash;
use triage_kernel::session::Session;

use crate::abort::{AbortMonitor, StepVerdict};
use crate::algorithm::{SearchAlgorithm, SearchContext};
use crate::astar::TerminationReason;
use crate::expansion::ExpansionPlan;
use crate::model::SearchModel;
use crate::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct IterativeDeepeningSearch {
    max_depth: usize,
}

impl IterativeDeepeningSearch {
    pub const DEFAULT_MAX_DEPTH: usize = 32;

    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn run(&self, ctx: &SearchContext, model: &mut SearchModel) -> TerminationReason {
        let started = Instant::now();
        let session = ctx.session();
        let plan = ExpansionPlan::new(session, model);
        plan.block_unreachable_targets(session, model);
        if model.active_targets().next().is_none() {
            return TerminationReason::NoTargets;
        }

        let mut monitor = ctx.abort_strategy().init(model);
        let mut bound = 0.0_f64;
        let mut iterations = 0u32;
        let reason = loop {
            iterations += 1;
            let mut walk = Walk {
                ctx,
                plan: &plan,
                monitor: monitor.as_mut(),
                bound,
                next_bound: f64::INFINITY,
                max_depth: self.max_depth,
                depth_cut: false,
                on_path: BTreeSet::new(),
            };
            let root = Path::empty();
            walk.on_path.insert(plan.fingerprint(session, &root));
            if let ControlFlow::Break(reason) = walk.descend(session, &root, model) {
                break reason;
            }
            let next_bound = walk.next_bound;
            if ExpansionPlan::all_targets_settled(model, bound) {
                break TerminationReason::Settled;
            }
            if next_bound.is_infinite() {
                if walk.depth_cut && model.active_targets().any(|t| !t.is_reached()) {
                    model.set_abort(true);
                    break TerminationReason::DepthLimited;
                }
                break TerminationReason::FrontierExhausted;
            }
            bound = next_bound;
        };

        model.add_calculation_steps(monitor.steps());
        model.add_calculation_time(started.elapsed());
        debug!(
            %reason,
            iterations,
            bound,
            expansions = monitor.steps(),
            "iterative deepening search finished"
        );
        reason
    }
}

impl Default for IterativeDeepeningSearch {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

impl SearchAlgorithm for IterativeDeepeningSearch {
    fn search(&self, ctx: &SearchContext, model: &mut SearchModel) {
        let _ = self.run(ctx, model);
    }

    fn name(&self) -> &'static str {
        "iterative-deepening"
    }
}

struct Walk<'a> {
    ctx: &'a SearchContext,
    plan: &'a ExpansionPlan,
    monitor: &'a mut dyn AbortMonitor,
    bound: f64,
    next_bound: f64,
    max_depth: usize,
    depth_cut: bool,
    on_path: BTreeSet<ContentHash>,
}

impl Walk<'_> {
    fn descend(
        &mut self,
        session: &Session,
        path: &Path,
        model: &mut SearchModel,
    ) -> ControlFlow<TerminationReason> {
        if model.is_aborted() {
            return ControlFlow::Break(TerminationReason::Cancelled);
        }
        for &step in self.plan.successors() {
            let Some((child, child_path)) = self.plan.expand(self.ctx, session, path, step, model)
            else {
                continue;
            };
            if child_path.costs() > self.bound {
                self.next_bound = self.next_bound.min(child_path.costs());
                continue;
            }
            model.offer_path(&child_path);
            if self.plan.is_target_only(step) {
                continue;
            }
            if child_path.len() >= self.max_depth {
                self.depth_cut = true;
                continue;
            }
            let fingerprint = self.plan.fingerprint(&child, &child_path);
            if !self.on_path.insert(fingerprint.clone()) {
                continue;
            }
            let flow = self.descend(&child, &child_path, model);
            self.on_path.remove(&fingerprint);
            flow?;
        }
        if self.monitor.next_step(path, model) == StepVerdict::Abort {
            if !model.is_any_target_reached() {
                model.set_abort(true);
            }
            return ControlFlow::Break(TerminationReason::BudgetExhausted);
        }
        ControlFlow::Continue(())
    }
}
