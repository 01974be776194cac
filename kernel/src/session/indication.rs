//! Indication states of test steps, merged over their sources.

use std::collections::BTreeMap;

/// Indication of one test step.
///
/// `MultipleIndicated(i)` carries the position of the step in an activated
/// sequence so that an interview agenda can present steps in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    Neutral,
    Indicated,
    MultipleIndicated(usize),
    ContraIndicated,
}

impl Indication {
    #[must_use]
    pub fn is_indicated(self) -> bool {
        matches!(self, Self::Indicated | Self::MultipleIndicated(_))
    }

    #[must_use]
    pub fn is_contra_indicated(self) -> bool {
        matches!(self, Self::ContraIndicated)
    }
}

/// Who asserted an indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicationSource {
    /// The cost/benefit planner activating a path.
    Planner,
    /// Rules of the knowledge base.
    Rule,
    User,
}

/// Merges per-source indications: contra-indication dominates, then
/// indication, else neutral.
#[must_use]
pub fn merge_indications(by_source: &BTreeMap<IndicationSource, Indication>) -> Indication {
    if by_source.values().any(|i| i.is_contra_indicated()) {
        return Indication::ContraIndicated;
    }
    by_source
        .values()
        .find(|i| i.is_indicated())
        .copied()
        .unwrap_or(Indication::Neutral)
}
