// ============================================================================
// File: src/session/registry.rs
// ----------------------------------------------------------------------------
// Backend registry mapping configured backend names to session constructors
// ============================================================================

use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};

use crate::errors::{HostError, HostResult};
use crate::session::errors::SessionResult;
use crate::session::ssh::{SSH2_BACKEND, Ssh2Session};
use crate::session::trait_def::Session;
use crate::session::types::SshTarget;

/// Session constructor for an SSH-class backend
pub type SessionConstructor = fn(&SshTarget) -> SessionResult<Box<dyn Session>>;

/// Name → constructor table
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    constructors: BTreeMap<String, SessionConstructor>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SSH2_BACKEND, Ssh2Session::boxed);
        registry
    }

    /// Register a constructor, replacing any previous one with that name
    pub fn register<N: Into<String>>(&mut self, name: N, constructor: SessionConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Look up a constructor by name
    ///
    /// Unknown names fail instead of falling back to a default backend.
    pub fn resolve(&self, name: &str) -> HostResult<SessionConstructor> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| HostError::UnknownBackend {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Whether a backend is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

/// Process-wide registry
static GLOBAL_REGISTRY: OnceLock<RwLock<BackendRegistry>> = OnceLock::new();

fn global() -> &'static RwLock<BackendRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(BackendRegistry::with_defaults()))
}

/// Register a backend in the process-wide registry
///
/// Meant to be called during startup, before hosts connect.
pub fn register_backend<N: Into<String>>(name: N, constructor: SessionConstructor) {
    let mut registry = global()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.register(name, constructor);
}

/// Resolve a backend from the process-wide registry
pub fn resolve_backend(name: &str) -> HostResult<SessionConstructor> {
    global()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .resolve(name)
}

/// Snapshot of the process-wide registry
pub fn backend_registry() -> BackendRegistry {
    global()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}
