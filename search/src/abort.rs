//! Search budgets.
//!
//! An [`AbortStrategy`] is configured once per planner and hands out a fresh
//! [`AbortMonitor`] for every search run. Algorithms poll the monitor once
//! per expanded node.

use std::fmt;

use crate::error::SearchError;
use crate::model::SearchModel;
use crate::path::Path;

/// Outcome of one budget poll.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepVerdict {
    Continue,
    Abort,
}

pub trait AbortStrategy: Send + Sync + fmt::Debug {
    /// Starts a run against `model`: zero steps, manual flag cleared.
    fn init(&self, model: &SearchModel) -> Box<dyn AbortMonitor>;

    /// Step budget before a reached target allows stopping, if bounded.
    fn max_steps(&self) -> Option<u64> {
        None
    }
}

pub trait AbortMonitor: Send {
    /// Counts one expanded node.
    fn next_step(&mut self, path: &Path, model: &SearchModel) -> StepVerdict;

    fn steps(&self) -> u64;

    /// Requests an abort at the next poll.
    fn abort(&mut self);
}

/// Abort after `max_steps` once some target is reached, and unconditionally
/// after `max_steps * increasing_factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultAbortStrategy {
    max_steps: u64,
    increasing_factor: f64,
}

impl DefaultAbortStrategy {
    pub const DEFAULT_MAX_STEPS: u64 = 100_000;
    pub const DEFAULT_INCREASING_FACTOR: f64 = 10.0;

    /// # Errors
    ///
    /// Rejects a zero step budget and factors below 1 (or non-finite).
    pub fn new(max_steps: u64, increasing_factor: f64) -> Result<Self, SearchError> {
        if max_steps == 0 {
            return Err(SearchError::ZeroMaxSteps);
        }
        if !increasing_factor.is_finite() || increasing_factor < 1.0 {
            return Err(SearchError::InvalidIncreasingFactor(increasing_factor));
        }
        Ok(Self {
            max_steps,
            increasing_factor,
        })
    }

    #[must_use]
    pub fn increasing_factor(&self) -> f64 {
        self.increasing_factor
    }

    /// The unconditional step limit.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn hard_limit(&self) -> u64 {
        (self.max_steps as f64 * self.increasing_factor).ceil() as u64
    }
}

impl Default for DefaultAbortStrategy {
    fn default() -> Self {
        Self {
            max_steps: Self::DEFAULT_MAX_STEPS,
            increasing_factor: Self::DEFAULT_INCREASING_FACTOR,
        }
    }
}

impl AbortStrategy for DefaultAbortStrategy {
    fn init(&self, _model: &SearchModel) -> Box<dyn AbortMonitor> {
        Box::new(DefaultAbortMonitor {
            steps: 0,
            max_steps: self.max_steps,
            hard_limit: self.hard_limit(),
            manual: false,
        })
    }

    fn max_steps(&self) -> Option<u64> {
        Some(self.max_steps)
    }
}

#[derive(Debug)]
struct DefaultAbortMonitor {
    steps: u64,
    max_steps: u64,
    hard_limit: u64,
    manual: bool,
}

impl AbortMonitor for DefaultAbortMonitor {
    fn next_step(&mut self, _path: &Path, model: &SearchModel) -> StepVerdict {
        self.steps += 1;
        if self.manual
            || (self.steps >= self.max_steps && model.is_any_target_reached())
            || self.steps >= self.hard_limit
        {
            StepVerdict::Abort
        } else {
            StepVerdict::Continue
        }
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn abort(&mut self) {
        self.manual = true;
    }
}
