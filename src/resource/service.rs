// file: src/resource/service.rs
// version: 1.0.0
// guid: 5e81c3a7-29f4-4b06-9d7a-c1e4f8b02d95

use super::{HostContext, Resource, ResourceState};
use crate::platform::ServiceAction;
use crate::Result;

/// A service that must be enabled at boot and running
#[derive(Debug, Clone)]
pub struct ServiceRunning {
    pub name: String,
}

impl ServiceRunning {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Resource for ServiceRunning {
    fn id(&self) -> String {
        format!("service:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "service"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let active = host
            .platform
            .service_active(host.exec.as_ref(), &self.name)
            .await?;
        Ok(if active {
            ResourceState::Converged
        } else {
            ResourceState::Drifted("not enabled or not running".to_string())
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let exec = host.exec.as_ref();
        host.platform
            .control_service(exec, &self.name, ServiceAction::Enable)
            .await?;
        host.platform
            .control_service(exec, &self.name, ServiceAction::Start)
            .await
    }
}
