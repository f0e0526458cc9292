// file: src/resource/package.rs
// version: 1.0.0
// guid: a2c74e19-0b58-4d3f-8e61-5f90b3d7c2a4

//! OS package sets

use super::{HostContext, Resource, ResourceState};
use crate::Result;
use tracing::debug;

/// A set of OS packages that must all be installed
#[derive(Debug, Clone)]
pub struct AptPackages {
    pub label: String,
    pub packages: Vec<String>,
}

impl AptPackages {
    pub fn new(label: impl Into<String>, packages: Vec<String>) -> Self {
        Self {
            label: label.into(),
            packages,
        }
    }

    async fn missing(&self, host: &HostContext) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for package in &self.packages {
            if host
                .platform
                .package_installed(host.exec.as_ref(), package)
                .await?
            {
                debug!("Package {} already installed", package);
            } else {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }
}

#[async_trait::async_trait]
impl Resource for AptPackages {
    fn id(&self) -> String {
        format!("packages:{}", self.label)
    }

    fn kind(&self) -> &'static str {
        "packages"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let missing = self.missing(host).await?;
        Ok(if missing.is_empty() {
            ResourceState::Converged
        } else if missing.len() == self.packages.len() {
            ResourceState::Missing
        } else {
            ResourceState::Drifted(format!("missing {}", missing.join(", ")))
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let missing = self.missing(host).await?;
        host.platform
            .install_packages(host.exec.as_ref(), &missing)
            .await
    }
}
