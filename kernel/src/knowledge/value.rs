//! Answer values.
//!
//! "Not answered" is the absence of a value, not a variant.

use std::fmt;

use ordered_float::OrderedFloat;

/// A value a question can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Choice(String),
    Number(OrderedFloat<f64>),
    Text(String),
    /// The user explicitly answered "unknown".
    Unknown,
}

impl Value {
    #[must_use]
    pub fn choice(name: impl Into<String>) -> Self {
        Self::Choice(name.into())
    }

    #[must_use]
    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Tagged byte encoding used for state fingerprints.
    ///
    /// Layout: one tag byte, then the payload (`u32` LE length + UTF-8 for
    /// strings, IEEE-754 LE bits for numbers).
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Choice(s) => {
                out.push(1);
                push_str(&mut out, s);
            }
            Self::Number(n) => {
                out.push(2);
                out.extend_from_slice(&n.0.to_bits().to_le_bytes());
            }
            Self::Text(s) => {
                out.push(3);
                push_str(&mut out, s);
            }
            Self::Unknown => out.push(4),
        }
        out
    }
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Choice(s) | Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n.0),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
