// file: src/steps/probe.rs
// version: 1.0.0
// guid: 0f7c3a58-b61e-4d29-a4f8-2e95d1c7b043

//! Environment probe
//!
//! Runs before the platform is selected and before anything on the host is
//! changed. Every failure here is fatal.

use crate::config::{DistroDescriptor, OS_RELEASE_PATH};
use crate::error::ProvisionError;
use crate::network::{CommandExecutor, HostIdentity};
use crate::Result;
use std::path::Path;
use tracing::info;

/// What the probe learned about the host
#[derive(Debug, Clone)]
pub struct ProbeFindings {
    pub identity: HostIdentity,
    pub distro: DistroDescriptor,
}

/// Checks identity, privilege escalation and distribution
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentProbe;

impl EnvironmentProbe {
    pub const NAME: &'static str = "probe";

    pub async fn run(&self, exec: &dyn CommandExecutor) -> Result<ProbeFindings> {
        let identity = exec.identity().await?;
        if identity.is_root() {
            return Err(ProvisionError::permission(
                "refusing to run as root; run as a regular user with sudo rights",
            ));
        }
        info!("Running as {} (uid {})", identity.user, identity.uid);

        if !exec.command_exists("sudo").await {
            return Err(ProvisionError::permission("sudo is not installed"));
        }
        exec.execute("sudo -v")
            .await
            .map_err(|e| ProvisionError::permission(format!("sudo is not usable: {}", e)))?;

        let os_release = exec
            .read_file(Path::new(OS_RELEASE_PATH), false)
            .await?
            .ok_or_else(|| {
                ProvisionError::unsupported_distro(format!("{} not found", OS_RELEASE_PATH))
            })?;
        let distro = DistroDescriptor::from_os_release(&os_release)?;
        let family = distro.family()?;
        info!("Detected {} ({} family)", distro, family.as_str());

        Ok(ProbeFindings { identity, distro })
    }
}
