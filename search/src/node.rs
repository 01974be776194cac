//! Search nodes and the frontier ordering key.

use ordered_float::OrderedFloat;
use triage_kernel::proof::hash::ContentHash;
use triage_kernel::session::Session;

use crate::path::Path;

/// A node of the best-first search: a session copy reached by `path`.
///
/// Ordering for frontier extraction uses `(f_cost, depth, creation_order)`
/// where `f_cost = g_cost + h_cost`. Lower is better; ties go to shallower
/// nodes, then to older ones.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub session: Session,
    pub path: Path,
    /// Identity under state deduplication.
    pub fingerprint: ContentHash,
    /// Net path costs.
    pub g_cost: OrderedFloat<f64>,
    /// Heuristic estimate; zero keeps the search a uniform-cost search.
    pub h_cost: OrderedFloat<f64>,
    /// Global counter for deterministic tie-breaking.
    pub creation_order: u64,
}

impl SearchNode {
    #[must_use]
    pub fn f_cost(&self) -> OrderedFloat<f64> {
        self.g_cost + self.h_cost
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierKey {
    pub f_cost: OrderedFloat<f64>,
    pub depth: usize,
    pub creation_order: u64,
}

impl PartialOrd for FrontierKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.f_cost
            .cmp(&other.f_cost)
            .then(self.depth.cmp(&other.depth))
            .then(self.creation_order.cmp(&other.creation_order))
    }
}

impl From<&SearchNode> for FrontierKey {
    fn from(node: &SearchNode) -> Self {
        Self {
            f_cost: node.f_cost(),
            depth: node.depth(),
            creation_order: node.creation_order,
        }
    }
}
