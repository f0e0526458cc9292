// file: src/steps/scaffold.rs
// version: 1.0.0
// guid: 9a37f2d5-6e04-4c18-b7a9-1d58e0c3f6a2

use super::{RunContext, Stage};
use crate::resource::{BoxedResource, ConvergeSummary, ProjectScaffold};
use crate::utils::shell_quote;
use crate::Result;
use tracing::info;

/// Sample project, verified by building it
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaffoldStage;

#[async_trait::async_trait]
impl Stage for ScaffoldStage {
    fn name(&self) -> &'static str {
        "scaffold"
    }

    fn description(&self) -> &'static str {
        "Create and build the sample project"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let scaffold_config = &ctx.config.scaffold;
        let env = ctx.dotnet_env();
        let project = ProjectScaffold {
            env: env.clone(),
            dir: ctx.paths.projects_dir.clone(),
            name: scaffold_config.project_name.clone(),
            template: scaffold_config.template.clone(),
            fallback: scaffold_config.fallback_template.clone(),
        };
        let project_dir = project.project_dir();

        let resources: Vec<BoxedResource> = vec![Box::new(project)];
        let mut summary = ConvergeSummary::default();
        ctx.reconciler
            .converge_all(&ctx.host, &resources, &mut summary)
            .await?;

        let build = format!(
            "cd {} && {}",
            shell_quote(&project_dir.to_string_lossy()),
            env.command("build --nologo")
        );
        if ctx.verify("dotnet build", &build).await?.is_some() {
            info!("✓ Project builds in {}", project_dir.display());
        }
        Ok(summary)
    }
}
