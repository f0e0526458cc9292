// file: src/steps/packages.rs
// version: 1.0.0
// guid: 3b8e1f62-c94d-4a07-b5e3-7d20a6f18c94

use super::{RunContext, Stage};
use crate::resource::{AptPackages, BoxedResource, ConvergeSummary};
use crate::Result;

/// Base OS packages
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageStage;

#[async_trait::async_trait]
impl Stage for PackageStage {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn description(&self) -> &'static str {
        "Install base OS packages"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let resources: Vec<BoxedResource> = vec![Box::new(AptPackages::new(
            "base",
            ctx.config.packages.0.clone(),
        ))];
        let mut summary = ConvergeSummary::default();
        ctx.reconciler
            .converge_all(&ctx.host, &resources, &mut summary)
            .await?;
        Ok(summary)
    }
}
