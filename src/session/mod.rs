// ============================================================================
// File: src/session/mod.rs
// ----------------------------------------------------------------------------
// Session abstraction and backend registry.
//
// Provides a unified interface over structurally different transports:
// - Session trait for run / transfer / tail / disconnect
// - SSH-backed session (libssh2)
// - Container-backed session (docker or podman CLI)
// - Registry resolving configured backend names to constructors
// ============================================================================

mod errors;
mod registry;
mod trait_def;
mod types;

pub mod container;
pub mod ssh;

pub use container::{ContainerRuntime, ContainerSession, run_with_timeout};
pub use errors::{SessionError, SessionResult};
pub use registry::{
    BackendRegistry, SessionConstructor, backend_registry, register_backend, resolve_backend,
};
pub use ssh::{SSH2_BACKEND, Ssh2Session};
pub use trait_def::{Session, shell_quote};
pub use types::{CommandResult, SshTarget, TailOutput};
