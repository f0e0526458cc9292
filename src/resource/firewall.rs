// file: src/resource/firewall.rs
// version: 1.0.0
// guid: b9d20f6e-84a1-4c37-a5e2-0d6c9f1b83e7

use super::{HostContext, Resource, ResourceState};
use crate::Result;

/// An allow rule in the host firewall
#[derive(Debug, Clone)]
pub struct FirewallRule {
    pub rule: String,
}

#[async_trait::async_trait]
impl Resource for FirewallRule {
    fn id(&self) -> String {
        format!("firewall-rule:{}", self.rule)
    }

    fn kind(&self) -> &'static str {
        "firewall-rule"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let present = host
            .platform
            .firewall_rule_present(host.exec.as_ref(), &self.rule)
            .await?;
        Ok(if present {
            ResourceState::Converged
        } else {
            ResourceState::Missing
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.platform
            .configure_firewall(host.exec.as_ref(), &self.rule)
            .await
    }
}

/// The firewall itself being active
#[derive(Debug, Clone, Default)]
pub struct FirewallEnabled;

#[async_trait::async_trait]
impl Resource for FirewallEnabled {
    fn id(&self) -> String {
        "firewall:enabled".to_string()
    }

    fn kind(&self) -> &'static str {
        "firewall"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let enabled = host.platform.firewall_enabled(host.exec.as_ref()).await?;
        Ok(if enabled {
            ResourceState::Converged
        } else {
            ResourceState::Drifted("inactive".to_string())
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.platform.enable_firewall(host.exec.as_ref()).await
    }
}
