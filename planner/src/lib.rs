//! Triage Planner: cost/benefit interview planning on top of
//! `triage_search`.
//!
//! # Crate dependency graph
//!
//! ```text
//! triage_kernel  ←  triage_search  ←  triage_planner
//! (kb, session)     (model, search)    (solver, engine)
//! ```
//!
//! # Propagation order
//!
//! One [`engine::InterviewEngine`] frame dispatches its changes to the
//! [`transition_driver::StateTransitionDriver`], then to
//! [`solver::CostBenefitSolver::propagate`], and finally asks
//! [`solver::CostBenefitSolver::check_path`] whether to replan.
//!
//! # Key types
//!
//! - [`solver::CostBenefitSolver`]: builds search models and activates paths
//! - [`state::PlannerState`]: per-session path, cursor and flags
//! - [`strategic::StrategicSupport`]: where targets and benefits come from
//! - [`expert::ExpertMode`]: manual target selection and recalculation
//! - [`config::PlannerConfig`]: JSON configuration

#![forbid(unsafe_code)]

pub mod agenda;
pub mod blocking;
pub mod config;
pub mod engine;
pub mod error;
pub mod expert;
pub mod logging;
pub mod solver;
pub mod state;
pub mod strategic;
pub mod transition_driver;
