// ============================================================================
// File: src/logging.rs
// ----------------------------------------------------------------------------
// env_logger initialisation for binaries embedding this crate
// ============================================================================

/// Variable consulted before `RUST_LOG`
pub const LOG_ENV: &str = "HOSTLINK_LOG";

/// Install env_logger
///
/// Uses `HOSTLINK_LOG` when set, otherwise `RUST_LOG`, otherwise `info`.
/// Returns false if a logger was already installed.
pub fn init() -> bool {
    let env = if std::env::var_os(LOG_ENV).is_some() {
        env_logger::Env::new().filter(LOG_ENV)
    } else {
        env_logger::Env::default().default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
