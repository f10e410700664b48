// ============================================================================
// File: src/settings/global.rs
// ----------------------------------------------------------------------------
// Global settings singleton
// ============================================================================

use std::sync::OnceLock;

use log::debug;

use super::{Settings, SettingsError};

/// Global settings, loaded from the environment unless installed first
static GLOBAL_SETTINGS: OnceLock<Result<Settings, SettingsError>> = OnceLock::new();

/// Get the process-wide settings
///
/// # Returns
/// Installed settings, or settings read from `HOSTLINK_SSH_*` variables on
/// first access. A malformed variable is reported on every call.
pub fn settings() -> Result<&'static Settings, SettingsError> {
    GLOBAL_SETTINGS
        .get_or_init(|| {
            debug!("Loading settings from environment");
            Settings::from_env()
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Install process-wide settings
///
/// Must run before the first host is constructed.
///
/// # Returns
/// Error if settings were already installed or loaded
pub fn init_settings(settings: Settings) -> Result<(), SettingsError> {
    GLOBAL_SETTINGS
        .set(Ok(settings))
        .map_err(|_| SettingsError::AlreadyInitialized)
}
