// ============================================================================
// File: src/session/container/mod.rs
// ----------------------------------------------------------------------------
// Container-backed session for hosts without a reachable SSH port.
//
// Drives the docker or podman CLI:
// - `exec` for command execution
// - `cp` for file transfer in both directions
// ============================================================================

mod process;
mod runtime;

pub use process::run_with_timeout;
pub use runtime::ContainerRuntime;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use log::{debug, info};

use crate::session::errors::{SessionError, SessionResult};
use crate::session::ssh::{file_name, join_remote, write_local};
use crate::session::trait_def::Session;
use crate::session::types::CommandResult;

/// Session that reaches a container through its runtime CLI
#[derive(Debug, Clone)]
pub struct ContainerSession {
    /// Container id or name
    container: String,

    /// Runtime owning the container
    runtime: ContainerRuntime,

    /// CLI executable; the runtime's binary on PATH when unset
    program: Option<PathBuf>,

    /// Set once `disconnect` has run
    closed: bool,
}

impl ContainerSession {
    /// Create a session for a running container
    pub fn new<C: Into<String>>(container: C, runtime: ContainerRuntime) -> Self {
        let container = container.into();
        info!("Using {runtime} exec session for container {container}");
        Self {
            container,
            runtime,
            program: None,
            closed: false,
        }
    }

    /// Drive the container through a specific CLI executable
    pub fn with_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Container id this session targets
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Runtime driving this session
    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    fn cli(&self) -> Command {
        match &self.program {
            Some(program) => Command::new(program),
            None => Command::new(self.runtime.binary()),
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Channel {
                details: format!("Session to container {} is closed", self.container),
            });
        }
        Ok(())
    }

    fn copy(&self, from: &str, to: &str, path: &str) -> SessionResult<()> {
        let mut cmd = self.cli();
        cmd.args(["cp", from, to]);

        let result = run_with_timeout(cmd, &format!("{} cp", self.runtime), None)?;
        if !result.is_success() {
            return Err(SessionError::Transfer {
                path: path.to_string(),
                details: format!(
                    "{} cp exited with {}: {}",
                    self.runtime,
                    result.status,
                    result.stderr.trim()
                ),
            });
        }
        Ok(())
    }
}

impl Session for ContainerSession {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> SessionResult<CommandResult> {
        self.ensure_open()?;

        let mut cmd = self.cli();
        cmd.args(["exec", &self.container, "sh", "-c", command]);

        run_with_timeout(cmd, command, timeout)
    }

    fn sftp_write(&mut self, local_path: &Path, remote_dir: &str) -> SessionResult<()> {
        self.ensure_open()?;

        let remote_path = join_remote(remote_dir, &file_name(local_path)?);
        debug!(
            "Copying {} into container {} at {}",
            local_path.display(),
            self.container,
            remote_path
        );

        let source = local_path.to_string_lossy();
        let destination = format!("{}:{}", self.container, remote_path);
        self.copy(&source, &destination, &remote_path)
    }

    fn sftp_read(
        &mut self,
        remote_path: &str,
        local_path: Option<&Path>,
        return_data: bool,
    ) -> SessionResult<Option<Vec<u8>>> {
        self.ensure_open()?;

        let staging = tempfile::tempdir().map_err(|e| SessionError::FileSystem {
            details: format!("Failed to create staging directory: {e}"),
        })?;
        let staged = staging.path().join("payload");

        let source = format!("{}:{}", self.container, remote_path);
        self.copy(&source, &staged.to_string_lossy(), remote_path)?;

        let data = fs::read(&staged).map_err(|e| SessionError::FileSystem {
            details: format!("Failed to read staged copy of {remote_path}: {e}"),
        })?;

        write_local(remote_path, local_path, return_data, &data)?;
        Ok(return_data.then_some(data))
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        if !self.closed {
            debug!("Releasing exec session for container {}", self.container);
            self.closed = true;
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        match self.runtime {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}
