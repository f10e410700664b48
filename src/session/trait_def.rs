// ============================================================================
// File: src/session/trait_def.rs
// ----------------------------------------------------------------------------
// Session trait definition
// ============================================================================

use std::path::Path;
use std::time::Duration;

use crate::session::errors::{SessionError, SessionResult};
use crate::session::types::CommandResult;

/// Core session trait
///
/// A session is an established transport bound to a single host. All
/// operations block the caller. Sessions are owned by their host and are
/// never driven by two callers at once.
pub trait Session: Send + std::fmt::Debug {
    /// Run a command and capture its output
    ///
    /// # Arguments
    /// * `command` - Shell command line
    /// * `timeout` - Maximum time to wait; `None` waits indefinitely
    ///
    /// A non-zero exit status is returned as a normal `CommandResult`.
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> SessionResult<CommandResult>;

    /// Copy a local file into a remote directory, keeping its file name
    fn sftp_write(&mut self, local_path: &Path, remote_dir: &str) -> SessionResult<()>;

    /// Copy a remote file locally and/or return its bytes
    ///
    /// # Arguments
    /// * `remote_path` - File to read
    /// * `local_path` - Destination; when `None` and `return_data` is false the
    ///   file lands in the current directory under its remote name
    /// * `return_data` - Return the bytes instead of only writing them
    fn sftp_read(
        &mut self,
        remote_path: &str,
        local_path: Option<&Path>,
        return_data: bool,
    ) -> SessionResult<Option<Vec<u8>>>;

    /// Mark the current end of a remote file
    ///
    /// Returns the byte offset that `tail_collect` reads from. A missing file
    /// yields offset 0.
    fn tail_start(&mut self, remote_path: &str) -> SessionResult<u64> {
        let quoted = shell_quote(remote_path);
        let result = self.run(&format!("wc -c < {quoted} 2>/dev/null || echo 0"), None)?;
        parse_size(&result.stdout)
    }

    /// Read everything appended to a remote file since `offset`
    fn tail_collect(&mut self, remote_path: &str, offset: u64) -> SessionResult<String> {
        let quoted = shell_quote(remote_path);
        let result = self.run(&format!("tail -c +{} {quoted}", offset + 1), None)?;
        if !result.is_success() {
            return Err(SessionError::Transfer {
                path: remote_path.to_string(),
                details: format!("tail exited with {}: {}", result.status, result.stderr.trim()),
            });
        }
        Ok(result.stdout)
    }

    /// Tear down the transport
    fn disconnect(&mut self) -> SessionResult<()>;

    /// Get the backend type identifier
    fn backend_type(&self) -> &'static str;
}

/// Quote a string for POSIX `sh`
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

fn parse_size(output: &str) -> SessionResult<u64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("0")
        .parse()
        .map_err(|e| SessionError::Channel {
            details: format!("Unexpected size output '{}': {e}", output.trim()),
        })
}
