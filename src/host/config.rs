// ============================================================================
// File: src/host/config.rs
// ----------------------------------------------------------------------------
// Connection configuration and connect-time overrides
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::session::ContainerRuntime;
use crate::settings::SshSettings;

use super::Host;

/// Resolved connection options of a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub username: String,
    pub password: Option<String>,
    /// Connect and handshake timeout
    pub connection_timeout: Duration,
    pub port: u16,
    pub key_filename: Option<PathBuf>,
    pub ipv6: bool,
    pub ipv4_fallback: bool,
    /// Registry name of the SSH session backend
    pub backend: String,
}

impl ConnectionConfig {
    /// Defaults taken from process-wide settings
    pub fn from_settings(settings: &SshSettings) -> Self {
        Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            connection_timeout: settings.connection_timeout(),
            port: settings.port,
            key_filename: settings.key_filename.clone(),
            ipv6: settings.ipv6,
            ipv4_fallback: settings.ipv4_fallback,
            backend: settings.backend.clone(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::from_settings(&SshSettings::default())
    }
}

/// Options applied to a host by `Host::connect` before reconnecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOverrides {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_timeout: Option<Duration>,
    pub port: Option<u16>,
    pub key_filename: Option<PathBuf>,
    pub ipv6: Option<bool>,
    pub ipv4_fallback: Option<bool>,
    pub backend: Option<String>,
    /// Runtime for a linked container
    pub runtime: Option<ContainerRuntime>,
}

impl ConnectOverrides {
    /// No overrides
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname<H: Into<String>>(mut self, hostname: H) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn username<U: Into<String>>(mut self, username: U) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password<P: Into<String>>(mut self, password: P) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn key_filename<K: Into<PathBuf>>(mut self, key: K) -> Self {
        self.key_filename = Some(key.into());
        self
    }

    pub fn ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = Some(ipv6);
        self
    }

    pub fn ipv4_fallback(mut self, fallback: bool) -> Self {
        self.ipv4_fallback = Some(fallback);
        self
    }

    pub fn backend<B: Into<String>>(mut self, backend: B) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Write every set option into the host
    pub(crate) fn apply(self, host: &mut Host) {
        if let Some(hostname) = self.hostname {
            host.hostname = Some(hostname);
        }

        let config = &mut host.config;
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(timeout) = self.connection_timeout {
            config.connection_timeout = timeout;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(key) = self.key_filename {
            config.key_filename = Some(key);
        }
        if let Some(ipv6) = self.ipv6 {
            config.ipv6 = ipv6;
        }
        if let Some(fallback) = self.ipv4_fallback {
            config.ipv4_fallback = fallback;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }

        if let (Some(runtime), Some(link)) = (self.runtime, host.container.as_mut()) {
            link.runtime = runtime;
        }
    }
}
