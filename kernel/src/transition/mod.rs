//! Transition module: firing state transitions and executing test steps on
//! sessions.
//!
//! Depends on `knowledge` and `session`.

pub mod execute;
pub mod fire;
