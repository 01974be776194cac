//! Append-only session protocol.
//!
//! Entries export to canonical JSON; floating point quantities are rendered
//! as strings so that protocol digests stay platform independent.

use serde_json::json;

use crate::proof::canon::{canonical_json_bytes, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash};
use crate::proof::hash_domain::HashDomain;

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEntry {
    /// A path was calculated and activated.
    CalculatedPath {
        time: u64,
        path: Vec<String>,
        target: Vec<String>,
        costs: f64,
        calculation_steps: u64,
    },
    /// A watched target was part of an activated plan.
    CalculatedTarget { time: u64, target: Vec<String> },
    ManualTargetSelection { time: u64, target: Vec<String> },
    Text { time: u64, message: String },
    Fact {
        time: u64,
        question: String,
        value: String,
    },
}

impl ProtocolEntry {
    /// Propagation time the entry was recorded at.
    #[must_use]
    pub fn time(&self) -> u64 {
        match self {
            Self::CalculatedPath { time, .. }
            | Self::CalculatedTarget { time, .. }
            | Self::ManualTargetSelection { time, .. }
            | Self::Text { time, .. }
            | Self::Fact { time, .. } => *time,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::CalculatedPath {
                time,
                path,
                target,
                costs,
                calculation_steps,
            } => json!({
                "type": "calculated_path",
                "time": time,
                "path": path,
                "target": target,
                "costs": costs.to_string(),
                "calculation_steps": calculation_steps,
            }),
            Self::CalculatedTarget { time, target } => json!({
                "type": "calculated_target",
                "time": time,
                "target": target,
            }),
            Self::ManualTargetSelection { time, target } => json!({
                "type": "manual_target_selection",
                "time": time,
                "target": target,
            }),
            Self::Text { time, message } => json!({
                "type": "text",
                "time": time,
                "message": message,
            }),
            Self::Fact {
                time,
                question,
                value,
            } => json!({
                "type": "fact",
                "time": time,
                "question": question,
                "value": value,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Protocol {
    entries: Vec<ProtocolEntry>,
}

impl Protocol {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProtocolEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[ProtocolEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical JSON array of all entries.
    ///
    /// # Errors
    ///
    /// Propagates [`CanonError`]; entries never contain floats, so this only
    /// fails if an entry encoding regresses.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        let array = serde_json::Value::Array(self.entries.iter().map(ProtocolEntry::to_json).collect());
        canonical_json_bytes(&array)
    }

    /// # Errors
    ///
    /// See [`Protocol::to_canonical_json_bytes`].
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        Ok(canonical_hash(
            HashDomain::Protocol,
            &self.to_canonical_json_bytes()?,
        ))
    }
}
