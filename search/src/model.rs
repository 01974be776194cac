//! The search model: targets, blocked steps and targets, the abort flag.
//!
//! A model is created per planning run. Sub-searches work on clones and are
//! merged back; the abort flag is the only state shared across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use triage_kernel::knowledge::terminology::TestStepId;

use crate::blocking::BlockingReason;
use crate::path::Path;
use crate::target::Target;

/// Cross-thread handle to a model's abort flag.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct SearchModel {
    targets: IndexMap<Vec<TestStepId>, Target>,
    blocked_targets: IndexMap<Vec<TestStepId>, BlockingReason>,
    blocked_steps: BTreeMap<TestStepId, BlockingReason>,
    /// Best target held fixed by [`SearchModel::replace_min_path`].
    pinned_best: Option<Vec<TestStepId>>,
    aborted: Arc<AtomicBool>,
    calculation_steps: u64,
    calculation_time: Duration,
}

impl SearchModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: IndexMap::new(),
            blocked_targets: IndexMap::new(),
            blocked_steps: BTreeMap::new(),
            pinned_best: None,
            aborted: Arc::new(AtomicBool::new(false)),
            calculation_steps: 0,
            calculation_time: Duration::ZERO,
        }
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    /// Registers a target. Re-adding an existing target is a no-op.
    pub fn add_target(&mut self, target: Target) {
        self.targets
            .entry(target.steps().to_vec())
            .or_insert(target);
    }

    /// Raises the benefit of the target with `steps`; unknown keys are ignored.
    pub fn maximize_benefit(&mut self, steps: &[TestStepId], benefit: f64) {
        if let Some(t) = self.targets.get_mut(steps) {
            t.maximize_benefit(benefit);
        }
    }

    /// Targets in registration order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    #[must_use]
    pub fn target(&self, steps: &[TestStepId]) -> Option<&Target> {
        self.targets.get(steps)
    }

    #[must_use]
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Unblocked targets in registration order.
    pub fn active_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets
            .values()
            .filter(|t| !self.blocked_targets.contains_key(t.steps()))
    }

    /// Steps of all unblocked targets.
    #[must_use]
    pub fn target_steps(&self) -> BTreeSet<TestStepId> {
        self.active_targets()
            .flat_map(|t| t.steps().iter().copied())
            .collect()
    }

    /// Records `path` for every unblocked target it reaches, if strictly
    /// cheaper than that target's current minimum. Returns whether any
    /// target improved.
    pub fn offer_path(&mut self, path: &Path) -> bool {
        let mut improved = false;
        for (key, target) in &mut self.targets {
            if self.blocked_targets.contains_key(key) || !target.is_reached_by(path) {
                continue;
            }
            improved |= target.offer_path(path);
        }
        if improved {
            self.pinned_best = None;
        }
        improved
    }

    /// Replaces the minimal path of a target unconditionally. The target
    /// stays the best target, even if the new path is costlier, until some
    /// target adopts a strictly cheaper path.
    pub fn replace_min_path(&mut self, steps: &[TestStepId], path: Path) {
        if let Some(t) = self.targets.get_mut(steps) {
            t.replace_min_path(path);
            self.pinned_best = Some(steps.to_vec());
        }
    }

    // -----------------------------------------------------------------------
    // Blocking
    // -----------------------------------------------------------------------

    pub fn block_target(&mut self, steps: &[TestStepId], reason: BlockingReason) {
        self.blocked_targets.entry(steps.to_vec()).or_insert(reason);
    }

    #[must_use]
    pub fn blocking_reason(&self, steps: &[TestStepId]) -> Option<BlockingReason> {
        self.blocked_targets.get(steps).copied()
    }

    #[must_use]
    pub fn is_target_blocked(&self, steps: &[TestStepId]) -> bool {
        self.blocked_targets.contains_key(steps)
    }

    /// Blocks a step. A step keeps the first reason it was blocked with.
    pub fn block_step(&mut self, step: TestStepId, reason: BlockingReason) {
        self.blocked_steps.entry(step).or_insert(reason);
    }

    pub fn unblock_step(&mut self, step: TestStepId) {
        self.blocked_steps.remove(&step);
    }

    #[must_use]
    pub fn is_step_blocked(&self, step: TestStepId) -> bool {
        self.blocked_steps.contains_key(&step)
    }

    #[must_use]
    pub fn blocked_steps(&self) -> &BTreeMap<TestStepId, BlockingReason> {
        &self.blocked_steps
    }

    // -----------------------------------------------------------------------
    // Best target
    // -----------------------------------------------------------------------

    /// The reached, unblocked target with the highest `benefit / positive_costs`.
    /// Ties go to the earliest registered target.
    #[must_use]
    pub fn best_target(&self) -> Option<&Target> {
        if let Some(pinned) = self.pinned_target() {
            return Some(pinned);
        }
        let mut best: Option<(&Target, f64)> = None;
        for target in self.active_targets() {
            let Some(ratio) = target.ratio() else {
                continue;
            };
            if best.map_or(true, |(_, r)| ratio > r) {
                best = Some((target, ratio));
            }
        }
        best.map(|(t, _)| t)
    }

    fn pinned_target(&self) -> Option<&Target> {
        let key = self.pinned_best.as_ref()?;
        if self.blocked_targets.contains_key(key) {
            return None;
        }
        self.targets.get(key).filter(|t| t.is_reached())
    }

    #[must_use]
    pub fn best_path(&self) -> Option<&Path> {
        self.best_target().and_then(Target::min_path)
    }

    /// Highest benefit among unblocked targets (zero without targets).
    #[must_use]
    pub fn best_benefit(&self) -> f64 {
        self.active_targets()
            .map(Target::benefit)
            .fold(0.0, f64::max)
    }

    /// Highest benefit among unblocked targets that have no path yet.
    #[must_use]
    pub fn best_unreached_benefit(&self) -> f64 {
        self.active_targets()
            .filter(|t| !t.is_reached())
            .map(Target::benefit)
            .fold(0.0, f64::max)
    }

    #[must_use]
    pub fn is_any_target_reached(&self) -> bool {
        self.active_targets().any(Target::is_reached)
    }

    // -----------------------------------------------------------------------
    // Abort and statistics
    // -----------------------------------------------------------------------

    pub fn set_abort(&mut self, aborted: bool) {
        self.aborted.store(aborted, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// A handle that aborts this model from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.aborted))
    }

    pub fn add_calculation_steps(&mut self, steps: u64) {
        self.calculation_steps = self.calculation_steps.saturating_add(steps);
    }

    #[must_use]
    pub fn calculation_steps(&self) -> u64 {
        self.calculation_steps
    }

    pub fn add_calculation_time(&mut self, elapsed: Duration) {
        self.calculation_time += elapsed;
    }

    #[must_use]
    pub fn calculation_time(&self) -> Duration {
        self.calculation_time
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Folds the results of a clone into this model.
    ///
    /// Strictly cheaper minimal paths are adopted, benefits are maximized,
    /// unknown targets are added and targets blocked in `other` become
    /// blocked here. Adopting a path releases a pinned best target.
    /// Statistics are not merged. Merging a model with an
    /// unchanged clone of itself changes nothing.
    pub fn merge(&mut self, other: &SearchModel) {
        let mut improved = false;
        for (key, theirs) in &other.targets {
            match self.targets.get_mut(key) {
                Some(mine) => {
                    mine.maximize_benefit(theirs.benefit());
                    if let Some(path) = theirs.min_path() {
                        improved |= mine.offer_path(path);
                    }
                }
                None => {
                    self.targets.insert(key.clone(), theirs.clone());
                    improved |= theirs.is_reached();
                }
            }
        }
        if improved {
            self.pinned_best = None;
        }
        for (key, reason) in &other.blocked_targets {
            self.blocked_targets.entry(key.clone()).or_insert(*reason);
        }
    }
}

impl Default for SearchModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones start with a fresh, cleared abort flag and zeroed statistics.
impl Clone for SearchModel {
    fn clone(&self) -> Self {
        Self {
            targets: self.targets.clone(),
            blocked_targets: self.blocked_targets.clone(),
            blocked_steps: self.blocked_steps.clone(),
            pinned_best: self.pinned_best.clone(),
            aborted: Arc::new(AtomicBool::new(false)),
            calculation_steps: 0,
            calculation_time: Duration::ZERO,
        }
    }
}
