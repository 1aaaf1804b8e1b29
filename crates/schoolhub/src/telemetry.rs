//! Logging setup for binaries built on the client.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is up to the application. [`init`] is the one-line default.

use std::error::Error;

use tracing_subscriber::{EnvFilter, fmt};

/// Error returned when a global subscriber is already installed.
pub type InitError = Box<dyn Error + Send + Sync + 'static>;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "schoolhub=info";

/// Installs a plain-text subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// # Errors
/// Fails if a global subscriber is already set.
pub fn init() -> Result<(), InitError> {
    init_with(DEFAULT_FILTER)
}

/// Like [`init`] with a different fallback filter, e.g. `"schoolhub=debug"`.
///
/// # Errors
/// As for [`init`].
pub fn init_with(default_filter: &str) -> Result<(), InitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}
