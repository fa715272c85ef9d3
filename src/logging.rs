//! Tracing setup
//!
//! JSON output filtered through `RUST_LOG`, defaulting to debug output for
//! this crate. SQL is logged at debug level with a `sql` field.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "librarian_query=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber. Panics if one is already set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Install the global subscriber unless one is already set.
///
/// Returns `false` when another subscriber was installed first.
pub fn try_init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok()
}
