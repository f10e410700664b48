// ============================================================================
// File: src/lib.rs
// ----------------------------------------------------------------------------
// hostlink: provider-agnostic host handles.
//
// - Host: identity, connection config, lazily attached session
// - Session: SSH (libssh2) or container (docker/podman) transport
// - Backend registry: configured backend name → session constructor
// - Settings: process-wide defaults, validated once
// ============================================================================

pub mod batch;
pub mod errors;
pub mod host;
pub mod logging;
pub mod session;
pub mod settings;

pub use errors::{HostError, HostResult};
pub use host::{
    Attributes, ConnectOverrides, ConnectionConfig, ContainerLink, Host, HostBuilder, HostGuard,
    HostHooks, HostRecord, PackageManager, ProviderLink,
};
pub use session::{
    BackendRegistry, CommandResult, ContainerRuntime, Session, SessionError, SessionResult,
    SshTarget, TailOutput, register_backend,
};
pub use settings::{Settings, SettingsError, SshSettings, init_settings};
