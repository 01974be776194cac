//! Typed search errors.
//!
//! `SearchError` covers construction-time failures only. Runtime outcomes
//! (no path, budget exhaustion, cancellation) are expressed through the
//! [`crate::model::SearchModel`]: an absent minimal path or the `aborted`
//! flag.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("a target needs at least one test step")]
    EmptyTarget,
    #[error("abort budget must allow at least one step")]
    ZeroMaxSteps,
    #[error("increasing factor must be at least 1, got {0}")]
    InvalidIncreasingFactor(f64),
    #[error("multi-search needs at least one delegate")]
    NoDelegates,
}
