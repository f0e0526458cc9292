// file: src/steps/runtime.rs
// version: 1.0.0
// guid: c5a09d37-2e8f-4b61-9d74-a1f3e6b85c20

//! .NET SDK installation and shell profile exports

use super::{RunContext, Stage};
use crate::config::RuntimeMethod;
use crate::resource::{BoxedResource, ConvergeSummary, DotnetSdk, LineInFile};
use crate::utils::double_quote_escape;
use crate::Result;
use regex::Regex;
use std::path::Path;
use tracing::info;

/// Profile lines as `(line, pattern of lines it replaces)`
pub fn profile_lines(
    method: RuntimeMethod,
    root: &Path,
    tools: &Path,
) -> Vec<(String, &'static str)> {
    let tools = double_quote_escape(&tools.to_string_lossy());
    let mut lines = vec![(
        "export DOTNET_CLI_TELEMETRY_OPTOUT=1".to_string(),
        r"^\s*export\s+DOTNET_CLI_TELEMETRY_OPTOUT=",
    )];
    match method {
        RuntimeMethod::Script => {
            let root = double_quote_escape(&root.to_string_lossy());
            lines.push((
                format!("export DOTNET_ROOT=\"{}\"", root),
                r"^\s*export\s+DOTNET_ROOT=",
            ));
            lines.push((
                format!("export PATH=\"$PATH:{}:{}\"", root, tools),
                r"^\s*export\s+PATH=.*\.dotnet",
            ));
        }
        RuntimeMethod::Repository => {
            lines.push((
                format!("export PATH=\"$PATH:{}\"", tools),
                r"^\s*export\s+PATH=.*\.dotnet",
            ));
        }
    }
    lines
}

/// Installs the SDK and makes it reachable from new shells
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeStage;

#[async_trait::async_trait]
impl Stage for RuntimeStage {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn description(&self) -> &'static str {
        "Install the .NET SDK"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let runtime = &ctx.config.runtime;
        info!(
            "Installing .NET SDK {} via {:?} method",
            runtime.channel, ctx.options.runtime_method
        );

        let env = ctx.dotnet_env();
        let mut resources: Vec<BoxedResource> = vec![Box::new(DotnetSdk {
            env: env.clone(),
            channel: runtime.channel.clone(),
            method: ctx.options.runtime_method,
            bootstrap_url: runtime.bootstrap_url.clone(),
            bootstrap_sha256: runtime.bootstrap_sha256.clone(),
            install_dir: ctx.paths.dotnet_root.clone(),
            sdk_package: runtime.sdk_package.clone(),
        })];

        let exports = profile_lines(
            ctx.options.runtime_method,
            &ctx.paths.dotnet_root,
            &ctx.paths.dotnet_tools,
        );
        for (line, pattern) in exports {
            let matcher = Regex::new(pattern)?;
            resources.push(Box::new(
                LineInFile::new(&ctx.paths.profile_file, line, 0o644).replacing(matcher),
            ));
        }

        let mut summary = ConvergeSummary::default();
        ctx.reconciler
            .converge_all(&ctx.host, &resources, &mut summary)
            .await?;

        let version = ctx
            .verify("dotnet --version", &env.command("--version"))
            .await?;
        if let Some(version) = version {
            info!("✓ .NET SDK {} available", version);
            ctx.versions.insert("dotnet".to_string(), version);
        }

        Ok(summary)
    }
}
