//! Configuration errors, raised at construction or load time, never during
//! a search.

use std::path::PathBuf;

use thiserror::Error;
use triage_search::error::SearchError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("strategic benefit factor must be 0 or greater, got {0}")]
    NegativeStrategicBenefitFactor(f64),

    #[error("invalid abort strategy: {0}")]
    AbortStrategy(#[from] SearchError),

    /// A configured step name does not exist in the knowledge base.
    #[error("unknown test step `{0}`")]
    UnknownTestStep(String),

    #[error("malformed planner config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot read planner config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
