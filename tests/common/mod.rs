// ============================================================================
// File: tests/common/mod.rs
// ----------------------------------------------------------------------------
// Local shell session backend for integration tests.
//
// Runs commands with `sh -c` on the test machine and treats the local file
// system as the remote one, so scenarios exercise real processes and files.
// ============================================================================

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use hostlink::session::{SessionConstructor, run_with_timeout};
use hostlink::{CommandResult, Host, Session, SessionError, SessionResult, SshTarget};

pub const LOCAL_BACKEND: &str = "local";

#[derive(Debug)]
pub struct LocalShellSession {
    open: bool,
}

impl LocalShellSession {
    pub fn boxed(_target: &SshTarget) -> SessionResult<Box<dyn Session>> {
        Ok(Box::new(LocalShellSession { open: true }))
    }
}

impl Session for LocalShellSession {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> SessionResult<CommandResult> {
        let mut cmd = std::process::Command::new("sh");
        cmd.args(["-c", command]);
        run_with_timeout(cmd, command, timeout)
    }

    fn sftp_write(&mut self, local_path: &Path, remote_dir: &str) -> SessionResult<()> {
        let name = local_path.file_name().ok_or_else(|| SessionError::FileSystem {
            details: format!("{} has no file name", local_path.display()),
        })?;
        fs::copy(local_path, Path::new(remote_dir).join(name))
            .map(|_| ())
            .map_err(|e| SessionError::Transfer {
                path: remote_dir.to_string(),
                details: e.to_string(),
            })
    }

    fn sftp_read(
        &mut self,
        remote_path: &str,
        local_path: Option<&Path>,
        return_data: bool,
    ) -> SessionResult<Option<Vec<u8>>> {
        let data = fs::read(remote_path).map_err(|e| SessionError::Transfer {
            path: remote_path.to_string(),
            details: e.to_string(),
        })?;
        if let Some(local_path) = local_path {
            fs::write(local_path, &data).map_err(|e| SessionError::FileSystem {
                details: e.to_string(),
            })?;
        }
        Ok(return_data.then_some(data))
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        self.open = false;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        LOCAL_BACKEND
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host wired to the local shell backend
pub fn local_host(hostname: &str) -> Host {
    init_logging();
    let constructor: SessionConstructor = LocalShellSession::boxed;
    hostlink::register_backend(LOCAL_BACKEND, constructor);
    Host::builder()
        .hostname(hostname)
        .backend(LOCAL_BACKEND)
        .build()
        .expect("local host builds")
}
