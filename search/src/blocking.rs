//! Reasons why a test step or target may not be used by a search.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockingReason {
    /// The activation condition is false for every value the final
    /// questions can still take.
    CheckOnceFalse,
    CannotReach,
    ContraIndicated,
    /// Permanently relevant steps are only used when selected directly.
    PermanentlyRelevant,
}

impl BlockingReason {
    pub const ALL: [BlockingReason; 4] = [
        Self::CheckOnceFalse,
        Self::CannotReach,
        Self::ContraIndicated,
        Self::PermanentlyRelevant,
    ];

    /// Human-readable message for `subject` (a step or target name).
    #[must_use]
    pub fn message(self, subject: &str) -> String {
        match self {
            Self::CheckOnceFalse => format!(
                "The preconditions of {subject} cannot be fulfilled due to final question values."
            ),
            Self::CannotReach => {
                format!("{subject} cannot be reached from the current state.")
            }
            Self::ContraIndicated => format!("{subject} is contra-indicated."),
            Self::PermanentlyRelevant => format!(
                "{subject} is permanently relevant and is only used when selected directly."
            ),
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckOnceFalse => "check-once-false",
            Self::CannotReach => "cannot-reach",
            Self::ContraIndicated => "contra-indicated",
            Self::PermanentlyRelevant => "permanently-relevant",
        };
        f.write_str(name)
    }
}
