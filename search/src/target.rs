//! Search targets: step sets with a benefit and the cheapest path found so far.

use triage_kernel::knowledge::terminology::TestStepId;

use crate::error::SearchError;
use crate::path::Path;

/// Benefit per unit of positive cost.
///
/// A free path with positive benefit rates infinitely well; without benefit
/// it rates zero.
#[must_use]
pub fn benefit_ratio(benefit: f64, positive_costs: f64) -> f64 {
    if positive_costs > 0.0 {
        benefit / positive_costs
    } else if benefit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// A diagnostic goal: a non-empty, order-significant list of test steps.
///
/// Identity is the step list. `benefit` only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    steps: Vec<TestStepId>,
    benefit: f64,
    min_path: Option<Path>,
}

impl Target {
    /// # Errors
    ///
    /// Returns [`SearchError::EmptyTarget`] for an empty step list.
    pub fn new(steps: Vec<TestStepId>) -> Result<Self, SearchError> {
        if steps.is_empty() {
            return Err(SearchError::EmptyTarget);
        }
        Ok(Self {
            steps,
            benefit: 0.0,
            min_path: None,
        })
    }

    #[must_use]
    pub fn single(step: TestStepId) -> Self {
        Self {
            steps: vec![step],
            benefit: 0.0,
            min_path: None,
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[TestStepId] {
        &self.steps
    }

    #[must_use]
    pub fn benefit(&self) -> f64 {
        self.benefit
    }

    #[must_use]
    pub fn min_path(&self) -> Option<&Path> {
        self.min_path.as_ref()
    }

    #[must_use]
    pub fn is_reached(&self) -> bool {
        self.min_path.is_some()
    }

    /// `benefit / positive_costs` of the minimal path, if reached.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        self.min_path
            .as_ref()
            .map(|p| benefit_ratio(self.benefit, p.positive_costs()))
    }

    /// A path reaches the target when it ends in one of the target's steps
    /// and contains all of them.
    #[must_use]
    pub fn is_reached_by(&self, path: &Path) -> bool {
        path.last().is_some_and(|last| self.steps.contains(&last)) && path.contains_all(&self.steps)
    }

    pub(crate) fn maximize_benefit(&mut self, benefit: f64) {
        if benefit > self.benefit {
            self.benefit = benefit;
        }
    }

    /// Keeps `path` if it is strictly cheaper than the current minimum.
    pub(crate) fn offer_path(&mut self, path: &Path) -> bool {
        let better = self
            .min_path
            .as_ref()
            .map_or(true, |current| path.costs() < current.costs());
        if better {
            self.min_path = Some(path.clone());
        }
        better
    }

    pub(crate) fn replace_min_path(&mut self, path: Path) {
        self.min_path = Some(path);
    }
}
