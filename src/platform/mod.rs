// file: src/platform/mod.rs
// version: 1.0.0
// guid: 6b0d94f3-2a71-4e8c-b5d2-81f7a9c3e046

//! Platform capability table
//!
//! Every distribution-specific action goes through [`Platform`]. One
//! implementation per supported distribution is selected once, right after
//! the host has been probed; nothing else branches on the distribution.

pub mod apt;
pub mod debian;
pub mod ubuntu;

pub use debian::DebianPlatform;
pub use ubuntu::UbuntuPlatform;

use crate::config::{DistroDescriptor, DistroFamily};
use crate::error::ProvisionError;
use crate::network::{CommandExecutor, Downloader};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Service manager actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Enable,
    Start,
    Restart,
    Reload,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Enable => "enable",
            ServiceAction::Start => "start",
            ServiceAction::Restart => "restart",
            ServiceAction::Reload => "reload",
        }
    }
}

/// Distribution-specific operations
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// The probed distribution
    fn descriptor(&self) -> &DistroDescriptor;

    /// Vendor repository configuration packages, most specific first
    fn repository_config_urls(&self) -> Vec<String>;

    /// Whether a package is installed
    async fn package_installed(&self, exec: &dyn CommandExecutor, package: &str) -> Result<bool> {
        apt::package_installed(exec, package).await
    }

    /// Refresh indexes, then install the packages
    async fn install_packages(&self, exec: &dyn CommandExecutor, packages: &[String]) -> Result<()> {
        apt::update(exec).await?;
        apt::install(exec, packages).await
    }

    /// Register the vendor package repository, trying each configuration in order
    async fn add_repository(
        &self,
        exec: &dyn CommandExecutor,
        downloader: &dyn Downloader,
    ) -> Result<()> {
        let mut last_error = None;
        for url in self.repository_config_urls() {
            match downloader.download(&url).await {
                Ok(artifact) => {
                    info!("Registering vendor repository from {}", url);
                    apt::install_local_deb(exec, artifact.path()).await?;
                    return apt::update(exec).await;
                }
                Err(e) => {
                    warn!("Repository configuration {} unavailable: {}", url, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ProvisionError::config("No repository configuration known for this distribution")
        }))
    }

    async fn service_active(&self, exec: &dyn CommandExecutor, service: &str) -> Result<bool> {
        apt::systemd_active(exec, service).await
    }

    async fn control_service(
        &self,
        exec: &dyn CommandExecutor,
        service: &str,
        action: ServiceAction,
    ) -> Result<()> {
        apt::systemd(exec, service, action).await
    }

    async fn firewall_rule_present(&self, exec: &dyn CommandExecutor, rule: &str) -> Result<bool> {
        apt::ufw_rule_present(exec, rule).await
    }

    /// Allow traffic for a ufw rule specification
    async fn configure_firewall(&self, exec: &dyn CommandExecutor, rule: &str) -> Result<()> {
        apt::ufw_allow(exec, rule).await
    }

    async fn firewall_enabled(&self, exec: &dyn CommandExecutor) -> Result<bool> {
        apt::ufw_active(exec).await
    }

    async fn enable_firewall(&self, exec: &dyn CommandExecutor) -> Result<()> {
        apt::ufw_enable(exec).await
    }
}

/// Select the platform implementation for a probed distribution
pub fn select_platform(descriptor: &DistroDescriptor) -> Result<Arc<dyn Platform>> {
    match descriptor.family()? {
        DistroFamily::Ubuntu => Ok(Arc::new(UbuntuPlatform::new(descriptor.clone()))),
        DistroFamily::Debian => Ok(Arc::new(DebianPlatform::new(descriptor.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, version: &str, codename: &str) -> DistroDescriptor {
        DistroDescriptor {
            id: id.to_string(),
            version: version.to_string(),
            codename: codename.to_string(),
        }
    }

    #[test]
    fn test_select_ubuntu() {
        let platform = select_platform(&descriptor("ubuntu", "24.04", "noble")).unwrap();
        assert_eq!(
            platform.repository_config_urls(),
            vec!["https://packages.microsoft.com/config/ubuntu/24.04/packages-microsoft-prod.deb"]
        );
    }

    #[test]
    fn test_select_debian_with_fallback() {
        let platform = select_platform(&descriptor("debian", "13", "trixie")).unwrap();
        assert_eq!(
            platform.repository_config_urls(),
            vec![
                "https://packages.microsoft.com/config/debian/13/packages-microsoft-prod.deb",
                "https://packages.microsoft.com/config/debian/12/packages-microsoft-prod.deb",
            ]
        );
    }

    #[test]
    fn test_select_unsupported() {
        let err = match select_platform(&descriptor("arch", "", "")) {
            Ok(_) => panic!("arch must not be supported"),
            Err(e) => e,
        };
        assert!(matches!(err, ProvisionError::UnsupportedDistro(_)));
    }
}
