// file: src/config/distro.rs
// version: 1.0.0
// guid: 9e2b6d41-0c7a-4f35-8b1e-64a3d2f90c17

//! Distribution identity read from `/etc/os-release`

use crate::error::ProvisionError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Path of the os-release file on the host
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Ubuntu,
    Debian,
}

impl DistroFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistroFamily::Ubuntu => "ubuntu",
            DistroFamily::Debian => "debian",
        }
    }
}

/// Operating system identity, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroDescriptor {
    pub id: String,
    pub version: String,
    pub codename: String,
}

impl DistroDescriptor {
    /// Parse the key/value content of an os-release file
    pub fn from_os_release(content: &str) -> Result<Self> {
        let fields: HashMap<&str, String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), unquote(value.trim())))
            .collect();

        let id = fields
            .get("ID")
            .cloned()
            .ok_or_else(|| ProvisionError::unsupported_distro("os-release has no ID field"))?;

        Ok(Self {
            id: id.to_lowercase(),
            version: fields.get("VERSION_ID").cloned().unwrap_or_default(),
            codename: fields
                .get("VERSION_CODENAME")
                .cloned()
                .unwrap_or_default()
                .to_lowercase(),
        })
    }

    /// Map the descriptor onto a supported family, or fail
    pub fn family(&self) -> Result<DistroFamily> {
        match (self.id.as_str(), self.version.as_str(), self.codename.as_str()) {
            ("ubuntu", "24.04", _) => Ok(DistroFamily::Ubuntu),
            ("debian", "13", _) | ("debian", "", "trixie") => Ok(DistroFamily::Debian),
            _ => Err(ProvisionError::unsupported_distro(format!(
                "{} {} ({}); supported: ubuntu 24.04, debian 13 (trixie)",
                self.id,
                if self.version.is_empty() { "?" } else { &self.version },
                if self.codename.is_empty() { "?" } else { &self.codename },
            ))),
        }
    }

    /// Version used in vendor repository paths, defaulting by codename
    pub fn effective_version(&self) -> &str {
        if self.version.is_empty() && self.codename == "trixie" {
            "13"
        } else {
            &self.version
        }
    }
}

impl std::fmt::Display for DistroDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.effective_version())?;
        if !self.codename.is_empty() {
            write!(f, " ({})", self.codename)?;
        }
        Ok(())
    }
}

fn unquote(value: &str) -> String {
    let trimmed = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    trimmed.to_string()
}
