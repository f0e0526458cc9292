// file: src/platform/ubuntu.rs
// version: 1.0.0
// guid: 0f7a3d2c-c615-4b89-9e40-5d1b8a62f7e3

//! Ubuntu platform

use super::Platform;
use crate::config::DistroDescriptor;

const MICROSOFT_CONFIG_BASE: &str = "https://packages.microsoft.com/config";

pub struct UbuntuPlatform {
    descriptor: DistroDescriptor,
}

impl UbuntuPlatform {
    pub fn new(descriptor: DistroDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait::async_trait]
impl Platform for UbuntuPlatform {
    fn descriptor(&self) -> &DistroDescriptor {
        &self.descriptor
    }

    fn repository_config_urls(&self) -> Vec<String> {
        vec![format!(
            "{}/ubuntu/{}/packages-microsoft-prod.deb",
            MICROSOFT_CONFIG_BASE,
            self.descriptor.effective_version()
        )]
    }
}
