//! Triage Search: minimal test step sequences for diagnostic targets.
//!
//! This crate depends only on `triage_kernel`; it does NOT depend on the
//! planner.
//!
//! # Crate dependency graph
//!
//! ```text
//! triage_kernel  ←  triage_search  ←  triage_planner
//! (kb, session)     (model, search)    (solver, engine)
//! ```
//!
//! # Key types
//!
//! - [`model::SearchModel`]: targets, blocked steps, best target, abort flag
//! - [`algorithm::SearchAlgorithm`]: the search contract
//! - [`astar::AStarSearch`], [`ids::IterativeDeepeningSearch`]: concrete searches
//! - [`multi::MultiSearchAlgorithm`]: continued, merged and parallel composition
//! - [`extender::PathExtender`]: comfort step insertion
//! - [`abort::DefaultAbortStrategy`]: step budgets
//! - [`executor::IterableExecutor`]: completion-order results from the worker pool

#![forbid(unsafe_code)]

pub mod abort;
pub mod algorithm;
pub mod astar;
pub mod blocking;
pub mod cost;
pub mod error;
pub mod executor;
pub mod expansion;
pub mod extender;
pub mod frontier;
pub mod hull;
pub mod ids;
pub mod model;
pub mod multi;
pub mod node;
pub mod path;
pub mod target;

#[cfg(test)]
pub(crate) mod testkit;
