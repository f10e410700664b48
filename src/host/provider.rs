// ============================================================================
// File: src/host/provider.rs
// ----------------------------------------------------------------------------
// Collaborators attached to a host: provider link, container link, hooks
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{HostError, HostResult};
use crate::session::ContainerRuntime;

use super::Host;

/// SSH port inside a container
pub const SSH_PORT: u16 = 22;

/// Handle to the system that owns a host's underlying resource
///
/// Hosts only ever need the instance identifier (for serialization) and,
/// optionally, the ability to release.
pub trait ProviderLink: Send + Sync + fmt::Debug {
    /// Identifier of the provider instance that produced the host
    fn instance(&self) -> &str;

    /// Hand the host's resource back to the provider
    ///
    /// Providers that cannot release keep the default, which fails.
    fn release(&self, host: &Host) -> HostResult<()> {
        Err(HostError::NotImplemented {
            operation: "release",
            hostname: host.label(),
        })
    }
}

/// Reference to the container backing a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLink {
    /// Container id or name
    pub id: String,

    /// Runtime that owns the container
    pub runtime: ContainerRuntime,

    /// Published ports, container port → host port
    pub ports: BTreeMap<u16, u16>,
}

impl ContainerLink {
    /// Link to a container with no published ports
    pub fn new<I: Into<String>>(id: I, runtime: ContainerRuntime) -> Self {
        Self {
            id: id.into(),
            runtime,
            ports: BTreeMap::new(),
        }
    }

    /// Add a published port
    pub fn with_port(mut self, container_port: u16, host_port: u16) -> Self {
        self.ports.insert(container_port, host_port);
        self
    }

    /// Whether the container publishes its SSH port
    pub fn has_ssh_port(&self) -> bool {
        self.ports.contains_key(&SSH_PORT)
    }
}

/// Custom provisioning and cleanup run around a managed session
///
/// Both steps default to no-ops.
pub trait HostHooks: Send + fmt::Debug {
    /// Run when a managed scope is entered
    fn setup(&mut self, _host: &mut Host) -> HostResult<()> {
        Ok(())
    }

    /// Run when a managed scope is exited
    fn teardown(&mut self, _host: &mut Host) -> HostResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_port_detection() {
        let link = ContainerLink::new("c0ffee", ContainerRuntime::Podman);
        assert!(!link.has_ssh_port());

        let link = link.with_port(8080, 38080);
        assert!(!link.has_ssh_port());

        let link = link.with_port(22, 32222);
        assert!(link.has_ssh_port());
    }
}
