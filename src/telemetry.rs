//! Log sink setup for processes embedding the event store.

use tracing_subscriber::EnvFilter;

use crate::config::StoreConfig;

/// Installs a global `tracing` subscriber filtered by `config.log_filter`
/// (overridden by `RUST_LOG` when set).
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_tracing(config: &StoreConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
