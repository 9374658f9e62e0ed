#![forbid(unsafe_code)]

//! Log output for applications.
//!
//! The crates only emit `tracing` records; nothing is printed unless the
//! application installs a subscriber. [`init`] installs a compact `fmt`
//! subscriber filtered by the `LFRAME_LOG` environment variable
//! (`EnvFilter` syntax, e.g. `LFRAME_LOG=lframe_runtime=debug`), defaulting
//! to `warn`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives.
pub const ENV_VAR: &str = "LFRAME_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Filter from `LFRAME_LOG`, or `default` when unset or invalid.
#[must_use]
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .try_init()
        .is_ok()
}
