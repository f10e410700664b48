// ============================================================================
// File: src/settings/gate.rs
// ----------------------------------------------------------------------------
// One-time validation of connection settings before the first host is built
// ============================================================================

use std::sync::OnceLock;

use log::debug;

use super::{SettingsError, settings};

/// Outcome of the single validation pass
static VALIDATION: OnceLock<Result<(), SettingsError>> = OnceLock::new();

/// Validate the global settings exactly once per process
///
/// Concurrent first callers block until one of them has finished the check;
/// everyone observes the same cached outcome afterwards.
pub fn validate_once() -> Result<(), SettingsError> {
    VALIDATION
        .get_or_init(|| {
            debug!("Validating ssh settings");
            settings().and_then(|s| s.validate())
        })
        .clone()
}
