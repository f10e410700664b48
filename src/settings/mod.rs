// ============================================================================
// File: src/settings/mod.rs
// ----------------------------------------------------------------------------
// Process-wide connection settings used as host defaults.
//
// Settings come from `HOSTLINK_SSH_*` environment variables or a JSON file,
// are installed once per process, and are validated once by the gate before
// the first host is built.
// ============================================================================

mod gate;
mod global;

pub use gate::validate_once;
pub use global::{init_settings, settings};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SSH2_BACKEND;

/// Environment variable prefix for SSH settings
pub const ENV_PREFIX: &str = "HOSTLINK_SSH_";

/// Settings errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A setting is missing or malformed
    #[error("Invalid setting SSH.{key}: {details}")]
    Invalid { key: &'static str, details: String },

    /// Settings source could not be read
    #[error("Failed to load settings: {details}")]
    Load { details: String },

    /// Global settings were installed twice
    #[error("Settings already initialized")]
    AlreadyInitialized,
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SSH connection defaults
    #[serde(rename = "SSH", alias = "ssh")]
    pub ssh: SshSettings,
}

/// SSH connection defaults applied to hosts constructed without explicit values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub username: String,
    pub password: Option<String>,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
    pub port: u16,
    pub key_filename: Option<PathBuf>,
    pub ipv6: bool,
    pub ipv4_fallback: bool,
    /// Registry name of the SSH session backend
    pub backend: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            password: Some("toor".to_string()),
            connection_timeout: 60,
            port: 22,
            key_filename: None,
            ipv6: false,
            ipv4_fallback: true,
            backend: SSH2_BACKEND.to_string(),
        }
    }
}

impl SshSettings {
    /// Connection timeout as a duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    /// Check that every required setting is present and well-formed
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.username.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "USERNAME",
                details: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(SettingsError::Invalid {
                key: "PORT",
                details: "must be between 1 and 65535".to_string(),
            });
        }
        if self.connection_timeout == 0 {
            return Err(SettingsError::Invalid {
                key: "CONNECTION_TIMEOUT",
                details: "must be greater than zero".to_string(),
            });
        }
        if self.backend.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "BACKEND",
                details: "must name a session backend".to_string(),
            });
        }
        if let Some(key) = &self.key_filename
            && key.as_os_str().is_empty()
        {
            return Err(SettingsError::Invalid {
                key: "KEY_FILENAME",
                details: "must not be empty when set".to_string(),
            });
        }
        Ok(())
    }
}

impl Settings {
    /// Validate all sections
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.ssh.validate()
    }

    /// Load settings from `HOSTLINK_SSH_*` environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut ssh = SshSettings::default();

        if let Some(username) = var("USERNAME") {
            ssh.username = username;
        }
        if let Some(password) = var("PASSWORD") {
            ssh.password = Some(password);
        }
        if let Some(timeout) = var("CONNECTION_TIMEOUT") {
            ssh.connection_timeout = parse_value("CONNECTION_TIMEOUT", &timeout)?;
        }
        if let Some(port) = var("PORT") {
            ssh.port = parse_value("PORT", &port)?;
        }
        if let Some(key) = var("KEY_FILENAME") {
            ssh.key_filename = Some(PathBuf::from(key));
        }
        if let Some(ipv6) = var("IPV6") {
            ssh.ipv6 = parse_flag("IPV6", &ipv6)?;
        }
        if let Some(fallback) = var("IPV4_FALLBACK") {
            ssh.ipv4_fallback = parse_flag("IPV4_FALLBACK", &fallback)?;
        }
        if let Some(backend) = var("BACKEND") {
            ssh.backend = backend;
        }

        Ok(Self { ssh })
    }

    /// Load settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Load {
            details: format!("{}: {e}", path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| SettingsError::Load {
            details: format!("{}: {e}", path.display()),
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| SettingsError::Invalid {
        key,
        details: format!("'{raw}': {e}"),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::Invalid {
            key,
            details: format!("'{raw}' is not a boolean"),
        }),
    }
}
