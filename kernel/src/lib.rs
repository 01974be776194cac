//! Triage Kernel: terminology, sessions and state transitions for
//! cost/benefit interview planning.
//!
//! # Module Dependency Direction
//!
//! `proof` ← `knowledge` ← `session` ← `transition`
//!
//! One-way only. `knowledge` evaluates conditions against the
//! [`knowledge::condition::Answers`] view and never sees a session.
//!
//! # Key types
//!
//! - [`knowledge::base::KnowledgeBase`]: validated questions, test steps and
//!   at most one state transition per test step
//! - [`knowledge::condition::Condition`]: three-valued conditions
//! - [`session::Session`]: blackboard, indications, propagation, protocol
//! - [`knowledge::state_transition::StateTransition`]: fired via
//!   [`transition::fire`]

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod knowledge;
pub mod proof;
pub mod session;
pub mod transition;
