//! Proof module: content hashing and canonical JSON for protocol export.
//!
//! Depends on nothing internal. `session` uses it for state fingerprints and
//! protocol digests.

pub mod canon;
pub mod hash;
pub mod hash_domain;
