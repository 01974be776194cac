//! Knowledge module: terminology, values, conditions, state transitions and
//! the validated [`base::KnowledgeBase`].
//!
//! Depends on nothing internal. Conditions evaluate against the
//! [`condition::Answers`] view so that this module never sees a session.

pub mod base;
pub mod condition;
pub mod state_transition;
pub mod terminology;
pub mod value;
