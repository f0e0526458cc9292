// file: src/platform/debian.rs
// version: 1.0.0
// guid: 4a9c2e71-7d30-4f1b-8c65-e2b09d4f1a38

//! Debian platform
//!
//! The vendor repository has historically lagged new Debian releases, so the
//! configuration for the prior stable release is listed as a fallback.
//! Debian does not ship ufw by default; it is installed before the first
//! firewall change.

use super::{apt, Platform};
use crate::config::DistroDescriptor;
use crate::network::CommandExecutor;
use crate::Result;
use tracing::info;

const MICROSOFT_CONFIG_BASE: &str = "https://packages.microsoft.com/config";

pub struct DebianPlatform {
    descriptor: DistroDescriptor,
}

impl DebianPlatform {
    pub fn new(descriptor: DistroDescriptor) -> Self {
        Self { descriptor }
    }

    fn prior_stable(version: &str) -> Option<String> {
        version
            .parse::<u32>()
            .ok()
            .and_then(|v| v.checked_sub(1))
            .map(|v| v.to_string())
    }

    async fn ensure_ufw(&self, exec: &dyn CommandExecutor) -> Result<()> {
        if !apt::package_installed(exec, "ufw").await? {
            info!("Installing ufw");
            apt::install(exec, &["ufw".to_string()]).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Platform for DebianPlatform {
    fn descriptor(&self) -> &DistroDescriptor {
        &self.descriptor
    }

    fn repository_config_urls(&self) -> Vec<String> {
        let version = self.descriptor.effective_version();
        let mut urls = vec![format!(
            "{}/debian/{}/packages-microsoft-prod.deb",
            MICROSOFT_CONFIG_BASE, version
        )];
        if let Some(prior) = Self::prior_stable(version) {
            urls.push(format!(
                "{}/debian/{}/packages-microsoft-prod.deb",
                MICROSOFT_CONFIG_BASE, prior
            ));
        }
        urls
    }

    async fn firewall_rule_present(&self, exec: &dyn CommandExecutor, rule: &str) -> Result<bool> {
        if !apt::package_installed(exec, "ufw").await? {
            return Ok(false);
        }
        apt::ufw_rule_present(exec, rule).await
    }

    async fn configure_firewall(&self, exec: &dyn CommandExecutor, rule: &str) -> Result<()> {
        self.ensure_ufw(exec).await?;
        apt::ufw_allow(exec, rule).await
    }

    async fn firewall_enabled(&self, exec: &dyn CommandExecutor) -> Result<bool> {
        if !apt::package_installed(exec, "ufw").await? {
            return Ok(false);
        }
        apt::ufw_active(exec).await
    }

    async fn enable_firewall(&self, exec: &dyn CommandExecutor) -> Result<()> {
        self.ensure_ufw(exec).await?;
        apt::ufw_enable(exec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_stable() {
        assert_eq!(DebianPlatform::prior_stable("13").as_deref(), Some("12"));
        assert_eq!(DebianPlatform::prior_stable("trixie"), None);
    }
}
