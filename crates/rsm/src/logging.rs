//! Logging bootstrap for binaries.
//!
//! Libraries only emit `tracing` events; installing a subscriber is the
//! binary's job. Hosts that already install their own subscriber should
//! skip this module entirely.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "rsm=info,rsm_session=info,rsm_store=warn,info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling
/// back to [`DEFAULT_FILTER`].
///
/// Calling it twice is harmless: the second call finds a subscriber
/// already installed and leaves it in place.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`] with a caller-chosen fallback filter.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
