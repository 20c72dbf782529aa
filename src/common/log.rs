//! Logging utilities
//!
//! Thin wrapper over `env_logger` so every entry point configures logging the same way.

/// Initialise the global logger
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once is harmless; later calls leave the first logger in place.
///
/// # Parameters
///
/// * `level` - Default log filter, e.g. `info` or `egress_proxy=debug`
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
