//! Diagnostic tracing for embedders and tests.
//!
//! Planner and search code log through `tracing` macros only; installing a
//! subscriber is left to the embedding program.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global subscriber reading `RUST_LOG` (default `warn`) and
/// writing compact lines to stderr.
///
/// ```bash
/// RUST_LOG=triage_planner=debug,triage_search=debug cargo test
/// ```
///
/// Calling it twice is harmless: the second installation is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
