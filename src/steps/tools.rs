// file: src/steps/tools.rs
// version: 1.0.0
// guid: 71e4b9c2-05da-4f83-a6e1-d82c3b7f490e

use super::{RunContext, Stage};
use crate::resource::{BoxedResource, ConvergeSummary, GlobalTool};
use crate::Result;

/// Global dotnet tools, each checked and installed on its own
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolStage;

#[async_trait::async_trait]
impl Stage for ToolStage {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn description(&self) -> &'static str {
        "Install global dotnet tools"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let env = ctx.dotnet_env();
        let resources: Vec<BoxedResource> = ctx
            .config
            .tools
            .0
            .iter()
            .map(|name| {
                Box::new(GlobalTool {
                    env: env.clone(),
                    name: name.clone(),
                }) as BoxedResource
            })
            .collect();

        let mut summary = ConvergeSummary::default();
        ctx.reconciler
            .converge_all(&ctx.host, &resources, &mut summary)
            .await?;
        Ok(summary)
    }
}
