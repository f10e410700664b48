// ============================================================================
// File: src/session/types.rs
// ----------------------------------------------------------------------------
// Command result and connection target types
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a command executed through a session
///
/// Contains captured output and exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status reported by the remote side (0 = success)
    pub status: i32,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Wall time spent waiting for the command
    pub duration: Duration,
}

impl CommandResult {
    /// Create a result from its parts
    pub fn new<O: Into<String>, E: Into<String>>(status: i32, stdout: O, stderr: E) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// Create a successful result
    pub fn success<O: Into<String>>(stdout: O) -> Self {
        Self::new(0, stdout, String::new())
    }

    /// Create a failed result
    pub fn failure<E: Into<String>>(status: i32, stderr: E) -> Self {
        Self::new(status, String::new(), stderr)
    }

    /// Set the measured duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Check if the command exited successfully
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stdout)
    }
}

/// Everything an SSH-class backend needs to open a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub key_filename: Option<PathBuf>,
    /// Connect and handshake timeout
    pub timeout: Duration,
    pub ipv6: bool,
    pub ipv4_fallback: bool,
}

impl SshTarget {
    /// `host:port` label used in logs and errors
    pub fn address(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

/// Output captured by a tail scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailOutput {
    /// Remote file that was tailed
    pub path: String,

    /// Content appended to the file while the scope was open
    pub stdout: String,
}
