// ============================================================================
// File: src/host/builder.rs
// ----------------------------------------------------------------------------
// Host construction: option resolution, identity check, extension attributes
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::errors::{HostError, HostResult};
use crate::settings::{self, validate_once};

use super::config::ConnectionConfig;
use super::provider::{ContainerLink, HostHooks, ProviderLink};
use super::{Attributes, Host};

/// Builder for [`Host`]
///
/// Every connection option left unset falls back to the process-wide
/// settings when `build` runs.
#[derive(Debug, Default)]
pub struct HostBuilder {
    hostname: Option<String>,
    ip: Option<String>,
    name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connection_timeout: Option<Duration>,
    port: Option<u16>,
    key_filename: Option<PathBuf>,
    ipv6: Option<bool>,
    ipv4_fallback: Option<bool>,
    backend: Option<String>,
    default_timeout: Duration,
    attrs: Attributes,
    container: Option<ContainerLink>,
    provider: Option<Arc<dyn ProviderLink>>,
    provider_instance: Option<Value>,
    hooks: Option<Box<dyn HostHooks>>,
    reconstructing: bool,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname<H: Into<String>>(mut self, hostname: H) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// IP address; used as the hostname when none is given
    pub fn ip<I: Into<String>>(mut self, ip: I) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
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

    /// Session backend name resolved through the registry
    pub fn backend<B: Into<String>>(mut self, backend: B) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Command timeout used by `execute` when none is given; zero waits forever
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Attach a provider-specific attribute
    pub fn attr<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Attach several provider-specific attributes
    pub fn attrs<I, K>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.attrs.extend(attrs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn container(mut self, link: ContainerLink) -> Self {
        self.container = Some(link);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ProviderLink>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Provider instance id carried by a persisted record
    pub(crate) fn provider_instance(mut self, instance: Value) -> Self {
        self.provider_instance = Some(instance);
        self
    }

    pub fn hooks(mut self, hooks: Box<dyn HostHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Mark the build as a checkin reconstruction
    ///
    /// Reconstructed hosts may lack a hostname; the caller completes them.
    pub fn reconstructing(mut self, reconstructing: bool) -> Self {
        self.reconstructing = reconstructing;
        self
    }

    /// Validate settings (once per process), resolve defaults and build
    pub fn build(self) -> HostResult<Host> {
        validate_once()?;
        let defaults = ConnectionConfig::from_settings(&settings::settings()?.ssh);

        let HostBuilder {
            hostname,
            ip,
            name,
            username,
            password,
            connection_timeout,
            port,
            key_filename,
            ipv6,
            ipv4_fallback,
            backend,
            default_timeout,
            mut attrs,
            container,
            provider,
            provider_instance,
            hooks,
            reconstructing,
        } = self;

        let hostname = hostname.or_else(|| ip.clone());
        if hostname.is_none() {
            if reconstructing {
                debug!("Ignoring missing hostname and ip for checkin reconstruction");
            } else {
                return Err(HostError::MissingIdentity);
            }
        }

        if let Some(ip) = ip {
            attrs.insert("ip".to_string(), Value::String(ip));
        }

        let config = ConnectionConfig {
            username: username.unwrap_or(defaults.username),
            password: password.or(defaults.password),
            connection_timeout: connection_timeout.unwrap_or(defaults.connection_timeout),
            port: port.unwrap_or(defaults.port),
            key_filename: key_filename.or(defaults.key_filename),
            ipv6: ipv6.unwrap_or(defaults.ipv6),
            ipv4_fallback: ipv4_fallback.unwrap_or(defaults.ipv4_fallback),
            backend: backend.unwrap_or(defaults.backend),
        };

        debug!(
            "Constructing host hostname={:?} name={:?} username={} port={} attrs={:?}",
            hostname,
            name,
            config.username,
            config.port,
            attrs.keys().collect::<Vec<_>>()
        );

        Ok(Host {
            hostname,
            name,
            config,
            default_timeout,
            attrs,
            container,
            provider,
            provider_instance,
            hooks,
            session: None,
        })
    }
}
