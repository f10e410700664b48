// ============================================================================
// File: src/session/errors.rs
// ----------------------------------------------------------------------------
// Transport-level error types shared by every session backend.
// ============================================================================

use std::time::Duration;

/// Session-specific error types
///
/// Covers failures of the transport itself. A command that runs and exits
/// non-zero is not an error at this level.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// TCP connection or SSH handshake failed
    #[error("Connection to {target} failed: {details}")]
    Connect { target: String, details: String },

    /// Authentication was rejected
    #[error("Authentication failed for user '{username}': {details}")]
    Auth { username: String, details: String },

    /// Command did not complete within its timeout
    #[error("Command '{command}' timed out after {}ms", .timeout.as_millis())]
    Timeout { command: String, timeout: Duration },

    /// Channel creation, exec or output read failed
    #[error("Channel operation failed: {details}")]
    Channel { details: String },

    /// File transfer failed
    #[error("Transfer of {path} failed: {details}")]
    Transfer { path: String, details: String },

    /// Local helper process (container runtime CLI) failed
    #[error("Process execution failed: {details}")]
    Process { details: String },

    /// Local file system operation failed
    #[error("File system operation failed: {details}")]
    FileSystem { details: String },
}

impl SessionError {
    /// Whether this error was caused by a command timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_uses_millis() {
        let err = SessionError::Timeout {
            command: "sleep 5".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Command 'sleep 5' timed out after 1500ms");
    }

    #[test]
    fn non_timeout_errors() {
        let err = SessionError::Auth {
            username: "root".to_string(),
            details: "bad key".to_string(),
        };
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("root"));
    }
}
