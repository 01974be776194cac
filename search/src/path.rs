//! Immutable test step sequences with accumulated costs.

use triage_kernel::knowledge::terminology::TestStepId;
use triage_kernel::proof::hash::{canonical_hash, ContentHash};
use triage_kernel::proof::hash_domain::HashDomain;

/// An ordered sequence of test steps.
///
/// Positive and negative step costs are accumulated separately; benefit
/// ratios use the positive part only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    steps: Vec<TestStepId>,
    positive_costs: f64,
    negative_costs: f64,
}

impl Path {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a path from `(step, cost)` pairs.
    #[must_use]
    pub fn from_steps(steps: impl IntoIterator<Item = (TestStepId, f64)>) -> Self {
        steps
            .into_iter()
            .fold(Self::empty(), |path, (step, cost)| path.extended(step, cost))
    }

    /// A new path with `step` appended.
    #[must_use]
    pub fn extended(&self, step: TestStepId, cost: f64) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next.add_cost(cost);
        next
    }

    /// A new path with `step` inserted before `position` (clamped to the end).
    #[must_use]
    pub fn inserted(&self, position: usize, step: TestStepId, cost: f64) -> Self {
        let mut next = self.clone();
        next.steps.insert(position.min(next.steps.len()), step);
        next.add_cost(cost);
        next
    }

    fn add_cost(&mut self, cost: f64) {
        if cost >= 0.0 {
            self.positive_costs += cost;
        } else {
            self.negative_costs += cost;
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[TestStepId] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<TestStepId> {
        self.steps.last().copied()
    }

    #[must_use]
    pub fn contains(&self, step: TestStepId) -> bool {
        self.steps.contains(&step)
    }

    #[must_use]
    pub fn contains_all(&self, steps: &[TestStepId]) -> bool {
        steps.iter().all(|s| self.contains(*s))
    }

    #[must_use]
    pub fn positive_costs(&self) -> f64 {
        self.positive_costs
    }

    /// Sum of negative step costs (zero or less).
    #[must_use]
    pub fn negative_costs(&self) -> f64 {
        self.negative_costs
    }

    /// Net costs: positive plus negative part.
    #[must_use]
    pub fn costs(&self) -> f64 {
        self.positive_costs + self.negative_costs
    }

    /// Identity of the step order, independent of costs: the step ids as
    /// little-endian `u32`s.
    #[must_use]
    pub fn digest(&self) -> ContentHash {
        let data: Vec<u8> = self.steps.iter().flat_map(|s| s.0.to_le_bytes()).collect();
        canonical_hash(HashDomain::PlannedPath, &data)
    }
}
