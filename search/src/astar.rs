//! Best-first search over session copies.
//!
//! Nodes are popped in order of net path cost. Every generated path is
//! offered to the model; the search ends when all unblocked targets hold a
//! path no more expensive than the cheapest open node, when the frontier
//! runs dry, when the budget is spent, or on external cancellation. With
//! negative step costs the minimality guarantee is lost.

use std::fmt;
use std::time::Instant;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::abort::StepVerdict;
use crate::algorithm::{SearchAlgorithm, SearchContext};
use crate::expansion::ExpansionPlan;
use crate::frontier::BestFirstFrontier;
use crate::model::SearchModel;
use crate::node::SearchNode;
use crate::path::Path;

/// Why a search run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// All targets hold a provably minimal path.
    Settled,
    FrontierExhausted,
    BudgetExhausted,
    /// A depth cap cut branches while targets were still unreached.
    DepthLimited,
    Cancelled,
    /// Nothing to search for.
    NoTargets,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Settled => "settled",
            Self::FrontierExhausted => "frontier-exhausted",
            Self::BudgetExhausted => "budget-exhausted",
            Self::DepthLimited => "depth-limited",
            Self::Cancelled => "cancelled",
            Self::NoTargets => "no-targets",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AStarSearch;

impl AStarSearch {
    /// Runs the search and reports why it stopped.
    pub fn run(&self, ctx: &SearchContext, model: &mut SearchModel) -> TerminationReason {
        let started = Instant::now();
        let session = ctx.session();
        let plan = ExpansionPlan::new(session, model);
        plan.block_unreachable_targets(session, model);
        if model.active_targets().next().is_none() {
            return TerminationReason::NoTargets;
        }

        let mut monitor = ctx.abort_strategy().init(model);
        let mut frontier = BestFirstFrontier::new();
        let mut creation_order = 0u64;
        let root_path = Path::empty();
        frontier.push(SearchNode {
            fingerprint: plan.fingerprint(session, &root_path),
            session: session.search_copy(),
            path: root_path,
            g_cost: OrderedFloat(0.0),
            h_cost: OrderedFloat(0.0),
            creation_order,
        });

        let reason = loop {
            if model.is_aborted() {
                break TerminationReason::Cancelled;
            }
            let Some(node) = frontier.pop() else {
                break TerminationReason::FrontierExhausted;
            };
            if ExpansionPlan::all_targets_settled(model, node.g_cost.0) {
                break TerminationReason::Settled;
            }

            for &step in plan.successors() {
                let Some((child, child_path)) =
                    plan.expand(ctx, &node.session, &node.path, step, model)
                else {
                    continue;
                };
                model.offer_path(&child_path);
                if plan.is_target_only(step) {
                    continue;
                }
                creation_order += 1;
                frontier.push(SearchNode {
                    fingerprint: plan.fingerprint(&child, &child_path),
                    g_cost: OrderedFloat(child_path.costs()),
                    h_cost: OrderedFloat(0.0),
                    session: child,
                    path: child_path,
                    creation_order,
                });
            }

            if monitor.next_step(&node.path, model) == StepVerdict::Abort {
                if !model.is_any_target_reached() {
                    model.set_abort(true);
                }
                break TerminationReason::BudgetExhausted;
            }
        };

        model.add_calculation_steps(monitor.steps());
        model.add_calculation_time(started.elapsed());
        debug!(
            %reason,
            expansions = monitor.steps(),
            frontier_high_water = frontier.high_water(),
            reopened = frontier.reopened(),
            suppressed = frontier.suppressed(),
            reached = model.is_any_target_reached(),
            "a* search finished"
        );
        reason
    }
}

impl SearchAlgorithm for AStarSearch {
    fn search(&self, ctx: &SearchContext, model: &mut SearchModel) {
        let _ = self.run(ctx, model);
    }

    fn name(&self) -> &'static str {
        "a-star"
    }
}
