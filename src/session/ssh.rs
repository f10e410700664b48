// ============================================================================
// File: src/session/ssh.rs
// ----------------------------------------------------------------------------
// SSH-backed session built on libssh2.
//
// Command execution over exec channels, file transfer and tailing over SFTP.
// ============================================================================

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::session::errors::{SessionError, SessionResult};
use crate::session::trait_def::Session;
use crate::session::types::{CommandResult, SshTarget};

/// Registry name of this backend
pub const SSH2_BACKEND: &str = "ssh2";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// SSH session to a single host
pub struct Ssh2Session {
    session: ssh2::Session,
    target: SshTarget,
    sftp: Option<ssh2::Sftp>,
    connected: bool,
}

impl std::fmt::Debug for Ssh2Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ssh2Session")
            .field("address", &self.target.address())
            .field("username", &self.target.username)
            .field("connected", &self.connected)
            .finish()
    }
}

impl Ssh2Session {
    /// Open and authenticate a session
    ///
    /// Key file authentication is used when a key is configured, password
    /// authentication otherwise. The target's timeout bounds the TCP connect,
    /// the handshake and authentication.
    pub fn connect(target: &SshTarget) -> SessionResult<Self> {
        let tcp = open_stream(target)?;

        let mut session = ssh2::Session::new().map_err(|e| SessionError::Connect {
            target: target.address(),
            details: format!("SSH session creation failed: {e}"),
        })?;

        session.set_timeout(millis(target.timeout));
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| SessionError::Connect {
            target: target.address(),
            details: format!("SSH handshake failed: {e}"),
        })?;

        match (&target.key_filename, &target.password) {
            (Some(key_path), _) => {
                session
                    .userauth_pubkey_file(&target.username, None, key_path, None)
                    .map_err(|e| SessionError::Auth {
                        username: target.username.clone(),
                        details: format!("key {} rejected: {e}", key_path.display()),
                    })?;
            }
            (None, Some(password)) => {
                session
                    .userauth_password(&target.username, password)
                    .map_err(|e| SessionError::Auth {
                        username: target.username.clone(),
                        details: format!("password rejected: {e}"),
                    })?;
            }
            (None, None) => {
                session
                    .userauth_agent(&target.username)
                    .map_err(|e| SessionError::Auth {
                        username: target.username.clone(),
                        details: format!("agent auth failed: {e}"),
                    })?;
            }
        }

        if !session.authenticated() {
            return Err(SessionError::Auth {
                username: target.username.clone(),
                details: "server did not accept credentials".to_string(),
            });
        }

        // Commands carry their own timeouts.
        session.set_timeout(0);

        info!("SSH session established to {}", target.address());
        Ok(Self {
            session,
            target: target.clone(),
            sftp: None,
            connected: true,
        })
    }

    /// Registry constructor
    pub fn boxed(target: &SshTarget) -> SessionResult<Box<dyn Session>> {
        Ok(Box::new(Self::connect(target)?))
    }

    fn sftp(&mut self) -> SessionResult<&ssh2::Sftp> {
        if self.sftp.is_none() {
            let sftp = self.session.sftp().map_err(|e| SessionError::Channel {
                details: format!("Failed to open SFTP subsystem: {e}"),
            })?;
            self.sftp = Some(sftp);
        }
        self.sftp.as_ref().ok_or_else(|| SessionError::Channel {
            details: "SFTP subsystem unavailable".to_string(),
        })
    }

    fn exec(&mut self, command: &str, deadline: Option<Instant>) -> SessionResult<CommandResult> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| SessionError::Channel {
                details: format!("Failed to create channel: {e}"),
            })?;

        channel.exec(command).map_err(|e| SessionError::Channel {
            details: format!("Exec failed: {e}"),
        })?;

        // Both streams share the channel window, so they are drained together.
        self.session.set_blocking(false);
        let read = pump(
            channel.stream(0),
            channel.stderr(),
            || channel.eof(),
            deadline,
        );
        self.session.set_blocking(true);

        let (stdout, stderr) = match read {
            Ok(output) => output,
            Err(e) => {
                // Free the channel before surfacing the error.
                let _ = channel.close();
                return Err(read_error(command, e));
            }
        };

        channel.wait_close().map_err(|e| SessionError::Channel {
            details: format!("Wait close failed: {e}"),
        })?;

        let status = channel.exit_status().map_err(|e| SessionError::Channel {
            details: format!("Get exit status failed: {e}"),
        })?;

        Ok(CommandResult::new(
            status,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }
}

impl Session for Ssh2Session {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> SessionResult<CommandResult> {
        let start = Instant::now();
        let previous = self.session.timeout();
        self.session.set_timeout(timeout.map(millis).unwrap_or(0));

        let outcome = self.exec(command, timeout.map(|t| start + t));
        self.session.set_timeout(previous);

        match outcome {
            Ok(result) => Ok(result.with_duration(start.elapsed())),
            Err(SessionError::Channel { .. }) if timeout.is_some_and(|t| start.elapsed() >= t) => {
                Err(SessionError::Timeout {
                    command: command.to_string(),
                    timeout: timeout.unwrap_or_default(),
                })
            }
            Err(SessionError::Timeout { command, .. }) => Err(SessionError::Timeout {
                command,
                timeout: timeout.unwrap_or_default(),
            }),
            Err(e) => Err(e),
        }
    }

    fn sftp_write(&mut self, local_path: &Path, remote_dir: &str) -> SessionResult<()> {
        let file_name = file_name(local_path)?;
        let remote_path = join_remote(remote_dir, &file_name);
        debug!("Uploading {} to {}", local_path.display(), remote_path);

        let mut local_file = fs::File::open(local_path).map_err(|e| SessionError::FileSystem {
            details: format!("Failed to open {}: {e}", local_path.display()),
        })?;

        let sftp = self.sftp()?;
        let mut remote_file =
            sftp.create(Path::new(&remote_path))
                .map_err(|e| SessionError::Transfer {
                    path: remote_path.clone(),
                    details: format!("Failed to create remote file: {e}"),
                })?;

        io::copy(&mut local_file, &mut remote_file).map_err(|e| SessionError::Transfer {
            path: remote_path.clone(),
            details: format!("File copy failed: {e}"),
        })?;
        remote_file.flush().map_err(|e| SessionError::Transfer {
            path: remote_path,
            details: format!("Flush failed: {e}"),
        })?;

        Ok(())
    }

    fn sftp_read(
        &mut self,
        remote_path: &str,
        local_path: Option<&Path>,
        return_data: bool,
    ) -> SessionResult<Option<Vec<u8>>> {
        debug!("Downloading {} from {}", remote_path, self.target.address());

        let sftp = self.sftp()?;
        let mut remote_file =
            sftp.open(Path::new(remote_path))
                .map_err(|e| SessionError::Transfer {
                    path: remote_path.to_string(),
                    details: format!("Failed to open remote file: {e}"),
                })?;

        let mut data = Vec::new();
        remote_file
            .read_to_end(&mut data)
            .map_err(|e| SessionError::Transfer {
                path: remote_path.to_string(),
                details: format!("Read failed: {e}"),
            })?;

        write_local(remote_path, local_path, return_data, &data)?;
        Ok(return_data.then_some(data))
    }

    fn tail_start(&mut self, remote_path: &str) -> SessionResult<u64> {
        match self.sftp()?.stat(Path::new(remote_path)) {
            Ok(stat) => Ok(stat.size.unwrap_or(0)),
            // Not created yet; everything written later is new.
            Err(_) => Ok(0),
        }
    }

    fn tail_collect(&mut self, remote_path: &str, offset: u64) -> SessionResult<String> {
        let sftp = self.sftp()?;
        let mut remote_file =
            sftp.open(Path::new(remote_path))
                .map_err(|e| SessionError::Transfer {
                    path: remote_path.to_string(),
                    details: format!("Failed to open remote file: {e}"),
                })?;

        remote_file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| SessionError::Transfer {
                path: remote_path.to_string(),
                details: format!("Seek failed: {e}"),
            })?;

        let mut data = Vec::new();
        remote_file
            .read_to_end(&mut data)
            .map_err(|e| SessionError::Transfer {
                path: remote_path.to_string(),
                details: format!("Read failed: {e}"),
            })?;

        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.sftp = None;
        info!("Closing SSH session to {}", self.target.address());
        self.session
            .disconnect(None, "session closed", None)
            .map_err(|e| SessionError::Channel {
                details: format!("Disconnect failed: {e}"),
            })
    }

    fn backend_type(&self) -> &'static str {
        SSH2_BACKEND
    }
}

/// Connect to the first reachable address, honouring the IPv6 preferences
fn open_stream(target: &SshTarget) -> SessionResult<TcpStream> {
    let resolved: Vec<SocketAddr> = (target.hostname.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| SessionError::Connect {
            target: target.address(),
            details: format!("Name resolution failed: {e}"),
        })?
        .collect();

    let candidates = order_addresses(resolved, target.ipv6, target.ipv4_fallback);
    if candidates.is_empty() {
        return Err(SessionError::Connect {
            target: target.address(),
            details: "No usable address for the configured IP family".to_string(),
        });
    }

    let mut last_error = None;
    for addr in candidates {
        debug!("Connecting to {} via {}", target.address(), addr);
        match TcpStream::connect_timeout(&addr, target.timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(format!("{addr}: {e}")),
        }
    }

    Err(SessionError::Connect {
        target: target.address(),
        details: last_error.unwrap_or_else(|| "TCP connection failed".to_string()),
    })
}

/// IPv6 first when enabled (IPv4 only as fallback), otherwise IPv4 only
pub(crate) fn order_addresses(
    resolved: Vec<SocketAddr>,
    ipv6: bool,
    ipv4_fallback: bool,
) -> Vec<SocketAddr> {
    let (v6, v4): (Vec<_>, Vec<_>) = resolved.into_iter().partition(SocketAddr::is_ipv6);
    if ipv6 {
        let mut ordered = v6;
        if ipv4_fallback {
            ordered.extend(v4);
        }
        ordered
    } else {
        v4
    }
}

pub(crate) fn file_name(local_path: &Path) -> SessionResult<String> {
    local_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SessionError::FileSystem {
            details: format!("{} has no file name", local_path.display()),
        })
}

pub(crate) fn join_remote(remote_dir: &str, file_name: &str) -> String {
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() {
        format!("/{file_name}")
    } else {
        format!("{dir}/{file_name}")
    }
}

/// Persist downloaded bytes according to the `sftp_read` contract
pub(crate) fn write_local(
    remote_path: &str,
    local_path: Option<&Path>,
    return_data: bool,
    data: &[u8],
) -> SessionResult<()> {
    let destination = match local_path {
        Some(path) => path.to_path_buf(),
        None if return_data => return Ok(()),
        None => {
            let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
            Path::new(".").join(name)
        }
    };

    fs::write(&destination, data).map_err(|e| SessionError::FileSystem {
        details: format!("Failed to write {}: {e}", destination.display()),
    })
}

fn read_error(command: &str, e: io::Error) -> SessionError {
    if e.kind() == io::ErrorKind::TimedOut {
        SessionError::Timeout {
            command: command.to_string(),
            timeout: Duration::ZERO,
        }
    } else {
        SessionError::Channel {
            details: format!("Failed to read output: {e}"),
        }
    }
}

/// Read stdout and stderr until the remote side signals EOF
///
/// The readers are non-blocking; `WouldBlock` means no data yet. Passing the
/// deadline yields `TimedOut`.
fn pump<O: Read, E: Read>(
    mut stdout: O,
    mut stderr: E,
    eof: impl Fn() -> bool,
    deadline: Option<Instant>,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut buf = [0u8; 32 * 1024];

    loop {
        let progressed = read_available(&mut stdout, &mut buf, &mut out)?
            | read_available(&mut stderr, &mut buf, &mut err)?;
        if progressed {
            continue;
        }
        if eof() {
            return Ok((out, err));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "command timed out"));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_available<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    into: &mut Vec<u8>,
) -> io::Result<bool> {
    match reader.read(buf) {
        Ok(0) => Ok(false),
        Ok(n) => {
            into.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(true),
        Err(e) => Err(e),
    }
}

/// libssh2 timeout in milliseconds; 0 would mean no timeout at all
fn millis(duration: Duration) -> u32 {
    if duration.is_zero() {
        return 0;
    }
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX).max(1)
}
