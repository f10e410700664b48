// ============================================================================
// File: src/host/mod.rs
// ----------------------------------------------------------------------------
// Host entity: identity, lazy session, command execution and teardown.
//
// A host owns at most one session at a time:
// - created lazily on first use, or eagerly by `connect`
// - container hosts without a published SSH port use the container session
// - everything else resolves its SSH backend through the registry
// - `close` disconnects and clears; dropping an open host closes as a
//   last resort and logs a warning
// ============================================================================

mod builder;
mod config;
mod probe;
mod provider;
mod record;
mod scoped;

#[cfg(test)]
mod tests;

pub use builder::HostBuilder;
pub use config::{ConnectOverrides, ConnectionConfig};
pub use probe::PackageManager;
pub use provider::{ContainerLink, HostHooks, ProviderLink, SSH_PORT};
pub use record::{HOST_RECORD_TYPE, HostRecord, RECORD_KEYS};
pub use scoped::HostGuard;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use crate::errors::{HostError, HostResult};
use crate::session::{
    CommandResult, ContainerSession, Session, SshTarget, TailOutput, resolve_backend,
};

/// Provider-specific attributes attached to a host
pub type Attributes = BTreeMap<String, Value>;

/// A remote or containerized machine plus what is needed to reach it
pub struct Host {
    pub(crate) hostname: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) config: ConnectionConfig,
    pub(crate) default_timeout: Duration,
    pub(crate) attrs: Attributes,
    pub(crate) container: Option<ContainerLink>,
    pub(crate) provider: Option<Arc<dyn ProviderLink>>,
    pub(crate) provider_instance: Option<Value>,
    pub(crate) hooks: Option<Box<dyn HostHooks>>,
    pub(crate) session: Option<Box<dyn Session>>,
}

impl Host {
    /// Start building a host
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Build a host from a hostname with every other option defaulted
    pub fn new<H: Into<String>>(hostname: H) -> HostResult<Self> {
        HostBuilder::new().hostname(hostname).build()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Complete the identity of a reconstructed host
    pub fn set_hostname<H: Into<String>>(&mut self, hostname: H) {
        self.hostname = Some(hostname.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<N: Into<String>>(&mut self, name: N) {
        self.name = Some(name.into());
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    /// Look up a provider-specific attribute
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn set_attr<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn container(&self) -> Option<&ContainerLink> {
        self.container.as_ref()
    }

    pub fn provider(&self) -> Option<&Arc<dyn ProviderLink>> {
        self.provider.as_ref()
    }

    /// Attach the provider that can release this host
    pub fn set_provider(&mut self, provider: Arc<dyn ProviderLink>) {
        self.provider = Some(provider);
    }

    /// Whether a session is currently attached
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Hostname, falling back to the name, for logs and errors
    pub fn label(&self) -> String {
        self.hostname
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unnamed host>")
            .to_string()
    }

    /// Get the attached session, connecting first if necessary
    pub fn session(&mut self) -> HostResult<&mut dyn Session> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.open_session()?,
        };
        Ok(&mut **self.session.insert(session))
    }

    /// Apply overrides and (re)create the session eagerly
    ///
    /// An already attached session is disconnected first.
    pub fn connect(&mut self, overrides: ConnectOverrides) -> HostResult<()> {
        overrides.apply(self);

        if let Some(mut previous) = self.session.take()
            && let Err(e) = previous.disconnect()
        {
            warn!("Failed to disconnect previous session of {}: {e}", self.label());
        }

        let session = self.open_session()?;
        self.session = Some(session);
        Ok(())
    }

    /// Connection target for SSH-class backends
    pub fn ssh_target(&self) -> HostResult<SshTarget> {
        let hostname = self
            .hostname
            .clone()
            .ok_or(HostError::MissingIdentity)?;

        Ok(SshTarget {
            hostname,
            port: self.config.port,
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            key_filename: self.config.key_filename.clone(),
            timeout: self.config.connection_timeout,
            ipv6: self.config.ipv6,
            ipv4_fallback: self.config.ipv4_fallback,
        })
    }

    fn open_session(&self) -> HostResult<Box<dyn Session>> {
        if let Some(link) = &self.container
            && !link.has_ssh_port()
        {
            return Ok(Box::new(ContainerSession::new(link.id.clone(), link.runtime)));
        }

        let target = self.ssh_target()?;
        let constructor = resolve_backend(&self.config.backend)?;
        debug!(
            "Creating {} session to {}",
            self.config.backend,
            target.address()
        );
        constructor(&target).map_err(|e| HostError::session(self.label(), "connect", e))
    }

    /// Execute a command on the host
    ///
    /// # Arguments
    /// * `command` - Shell command line
    /// * `timeout` - Overrides the host's default timeout for this call;
    ///   `Duration::ZERO` waits indefinitely
    ///
    /// # Returns
    /// The command's result. A non-zero exit is not an error; transport
    /// failures and timeouts are.
    pub fn execute(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> HostResult<CommandResult> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let timeout = (!timeout.is_zero()).then_some(timeout);
        let label = self.label();

        debug!("{label} executing command: {command}");
        let result = self
            .session()?
            .run(command, timeout)
            .map_err(|e| HostError::session(&label, "execute", e))?;
        debug!("{label} command result:\n{result}");

        Ok(result)
    }

    /// Copy a local file into a remote directory
    pub fn sftp_write<P: AsRef<Path>>(
        &mut self,
        local_path: P,
        remote_dir: &str,
    ) -> HostResult<()> {
        let label = self.label();
        self.session()?
            .sftp_write(local_path.as_ref(), remote_dir)
            .map_err(|e| HostError::session(label, "sftp_write", e))
    }

    /// Copy a remote file locally and/or return its bytes
    pub fn sftp_read(
        &mut self,
        remote_path: &str,
        local_path: Option<&Path>,
        return_data: bool,
    ) -> HostResult<Option<Vec<u8>>> {
        let label = self.label();
        self.session()?
            .sftp_read(remote_path, local_path, return_data)
            .map_err(|e| HostError::session(label, "sftp_read", e))
    }

    /// Capture what gets appended to a remote file while `scope` runs
    ///
    /// Content present before the scope is excluded. The remote file is left
    /// in place.
    pub fn tail_file<T, F>(&mut self, remote_path: &str, scope: F) -> HostResult<(T, TailOutput)>
    where
        F: FnOnce(&mut Host) -> HostResult<T>,
    {
        let label = self.label();
        let offset = self
            .session()?
            .tail_start(remote_path)
            .map_err(|e| HostError::session(&label, "tail_file", e))?;

        let value = scope(self)?;

        let stdout = self
            .session()?
            .tail_collect(remote_path, offset)
            .map_err(|e| HostError::session(&label, "tail_file", e))?;

        Ok((
            value,
            TailOutput {
                path: remote_path.to_string(),
                stdout,
            },
        ))
    }

    /// Disconnect and drop the session, if any
    ///
    /// Safe to call repeatedly. The session is detached even when disconnect
    /// fails.
    pub fn close(&mut self) -> HostResult<()> {
        match self.session.take() {
            None => Ok(()),
            Some(mut session) => session
                .disconnect()
                .map_err(|e| HostError::session(self.label(), "disconnect", e)),
        }
    }

    /// Release the host's resource back to its provider
    ///
    /// Fails with `NotImplemented` unless a provider link that supports
    /// release is attached. Closes the session on success.
    pub fn release(&mut self) -> HostResult<()> {
        let provider = self.provider.clone().ok_or_else(|| HostError::NotImplemented {
            operation: "release",
            hostname: self.label(),
        })?;

        provider.release(self)?;
        self.close()
    }

    /// Run the setup hook, if one is attached
    pub fn setup(&mut self) -> HostResult<()> {
        match self.hooks.take() {
            None => Ok(()),
            Some(mut hooks) => {
                let outcome = hooks.setup(self);
                self.hooks = Some(hooks);
                outcome
            }
        }
    }

    /// Run the teardown hook, if one is attached
    pub fn teardown(&mut self) -> HostResult<()> {
        match self.hooks.take() {
            None => Ok(()),
            Some(mut hooks) => {
                let outcome = hooks.teardown(self);
                self.hooks = Some(hooks);
                outcome
            }
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!(
                "Host {} dropped with an open session; closing it",
                self.label()
            );
            if let Err(e) = self.close() {
                warn!("{e}");
            }
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("hostname", &self.hostname)
            .field("name", &self.name)
            .field("username", &self.config.username)
            .field("port", &self.config.port)
            .field("backend", &self.config.backend)
            .field("attrs", &self.attrs)
            .field("container", &self.container)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Host(hostname={}, name={}, username={}, port={}",
            self.hostname.as_deref().unwrap_or("None"),
            self.name.as_deref().unwrap_or("None"),
            self.config.username,
            self.config.port
        )?;
        for (key, value) in self.attrs.iter().filter(|(k, _)| !k.starts_with('_')) {
            write!(f, ", {key}={value}")?;
        }
        f.write_str(")")
    }
}
