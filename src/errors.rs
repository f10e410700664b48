// ============================================================================
// File: src/errors.rs
// ----------------------------------------------------------------------------
// Crate-level error types
// ============================================================================

use crate::session::SessionError;
use crate::settings::SettingsError;

/// Errors surfaced by host operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// Host built without hostname or ip outside reconstruction
    #[error("Host must be constructed with a hostname or ip")]
    MissingIdentity,

    /// Operation not provided for this host's provider
    #[error("{operation} has not been implemented for this provider (host {hostname})")]
    NotImplemented {
        operation: &'static str,
        hostname: String,
    },

    /// Connection settings failed validation
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Configured session backend is not registered
    #[error("Unknown session backend '{name}' (registered: {known})")]
    UnknownBackend { name: String, known: String },

    /// Serialized host record could not be used
    #[error("Invalid host record: {details}")]
    InvalidRecord { details: String },

    /// Transport failure while performing an operation
    #[error("{operation} on {hostname} failed: {source}")]
    Session {
        hostname: String,
        operation: &'static str,
        #[source]
        source: SessionError,
    },
}

impl HostError {
    /// Wrap a session error with host context
    pub fn session<H: Into<String>>(
        hostname: H,
        operation: &'static str,
        source: SessionError,
    ) -> Self {
        HostError::Session {
            hostname: hostname.into(),
            operation,
            source,
        }
    }

    /// Whether this error is a command timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, HostError::Session { source, .. } if source.is_timeout())
    }
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn session_error_carries_context() {
        let err = HostError::session(
            "h1.example.com",
            "execute",
            SessionError::Timeout {
                command: "sleep 9".to_string(),
                timeout: Duration::from_secs(1),
            },
        );
        assert!(err.is_timeout());
        let message = err.to_string();
        assert!(message.contains("h1.example.com"));
        assert!(message.contains("execute"));
    }

    #[test]
    fn not_implemented_message() {
        let err = HostError::NotImplemented {
            operation: "release",
            hostname: "h1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "release has not been implemented for this provider (host h1)"
        );
        assert!(!err.is_timeout());
    }
}
