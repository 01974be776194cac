//! Best-first frontier with cost-aware state deduplication.
//!
//! A state is re-opened when it is reached again more cheaply; the stale heap
//! entry is skipped lazily on pop.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use ordered_float::OrderedFloat;

use crate::node::{FrontierKey, SearchNode};

/// `BinaryHeap` is a max-heap, so the key is wrapped in `Reverse` to pop the
/// lowest `f_cost` first.
#[derive(Debug)]
struct FrontierEntry {
    key: Reverse<FrontierKey>,
    node: SearchNode,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Default)]
pub struct BestFirstFrontier {
    heap: BinaryHeap<FrontierEntry>,
    /// Cheapest known `g_cost` per fingerprint hex digest.
    best_g: BTreeMap<String, OrderedFloat<f64>>,
    high_water: u64,
    reopened: u64,
    suppressed: u64,
}

impl BestFirstFrontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `node` unless its state is already known at equal or lower cost.
    pub fn push(&mut self, node: SearchNode) -> bool {
        let fp = node.fingerprint.hex_digest().to_string();
        match self.best_g.get(&fp) {
            Some(g) if *g <= node.g_cost => {
                self.suppressed += 1;
                return false;
            }
            Some(_) => self.reopened += 1,
            None => {}
        }
        self.best_g.insert(fp, node.g_cost);
        self.heap.push(FrontierEntry {
            key: Reverse(FrontierKey::from(&node)),
            node,
        });
        self.high_water = self.high_water.max(self.heap.len() as u64);
        true
    }

    /// Pops the best live node, skipping entries superseded by a cheaper push.
    pub fn pop(&mut self) -> Option<SearchNode> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .best_g
                .get(entry.node.fingerprint.hex_digest())
                .is_some_and(|g| *g == entry.node.g_cost);
            if live {
                return Some(entry.node);
            }
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.high_water
    }

    /// States re-opened because a cheaper path reached them.
    #[must_use]
    pub fn reopened(&self) -> u64 {
        self.reopened
    }

    /// Pushes rejected as duplicates.
    #[must_use]
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
