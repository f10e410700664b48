// ============================================================================
// File: src/host/probe.rs
// ----------------------------------------------------------------------------
// Best-effort package manager detection
// ============================================================================

use std::fmt;

use log::debug;

use super::Host;

/// Package managers the probe knows about, in probe order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Yum,
    Dnf,
    Zypper,
}

impl PackageManager {
    pub const CANDIDATES: [PackageManager; 3] =
        [PackageManager::Yum, PackageManager::Dnf, PackageManager::Zypper];

    pub fn command(self) -> &'static str {
        match self {
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
            PackageManager::Zypper => "zypper",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl Host {
    /// Guess the remote package manager
    ///
    /// Returns the first candidate that `which` resolves. Any failure, including
    /// transport errors, counts as a miss; the probe never errors.
    pub fn pkg_mgr(&mut self) -> Option<PackageManager> {
        for candidate in PackageManager::CANDIDATES {
            let mgr = candidate.command();
            match self.execute(&format!("which {mgr}"), None) {
                Ok(result) if resolved(mgr, &result.stdout, result.is_success()) => {
                    return Some(candidate);
                }
                Ok(_) => {}
                Err(e) => debug!("Package manager probe for {mgr} failed: {e}"),
            }
        }
        None
    }
}

/// `which` output reports a hit
fn resolved(mgr: &str, stdout: &str, success: bool) -> bool {
    success && !stdout.trim().is_empty() && !stdout.contains(&format!("no {mgr} in"))
}
