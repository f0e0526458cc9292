// file: src/resource/dotnet.rs
// version: 1.0.0
// guid: 94d0e6a2-7c31-4b5f-8e29-3af1c05d7b86

//! .NET SDK, global tools and project scaffolding

use super::{FailurePolicy, HostContext, Resource, ResourceState};
use crate::config::RuntimeMethod;
use crate::utils::shell_quote;
use crate::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Environment prefix for dotnet commands
///
/// A fresh install is not on the PATH of the running process yet, so every
/// dotnet invocation is prefixed with the exports it needs.
#[derive(Debug, Clone)]
pub struct DotnetEnv {
    /// Per-user install root, `None` when the SDK comes from a package
    pub root: Option<PathBuf>,
    pub tools_dir: PathBuf,
}

impl DotnetEnv {
    pub fn prefix(&self) -> String {
        let mut prefix = String::from("export DOTNET_CLI_TELEMETRY_OPTOUT=1 DOTNET_NOLOGO=1; ");
        let tools = shell_quote(&self.tools_dir.to_string_lossy());
        match &self.root {
            Some(root) => {
                let root = shell_quote(&root.to_string_lossy());
                prefix.push_str(&format!(
                    "export DOTNET_ROOT={0}; export PATH={0}:{1}:\"$PATH\"; ",
                    root, tools
                ));
            }
            None => prefix.push_str(&format!("export PATH=\"$PATH\":{}; ", tools)),
        }
        prefix
    }

    /// Wrap a dotnet command line with the environment prefix
    pub fn command(&self, args: &str) -> String {
        format!("{}dotnet {}", self.prefix(), args)
    }
}

/// True when `dotnet --list-sdks` output contains an SDK from `channel`
pub fn sdk_matches_channel(list_sdks: &str, channel: &str) -> bool {
    let wanted = format!("{}.", channel);
    list_sdks
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .any(|version| version.starts_with(&wanted))
}

/// Package ids from `dotnet tool list -g` output, lowercased
pub fn installed_tools(tool_list: &str) -> Vec<String> {
    tool_list
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with("Package Id") && !l.starts_with('-'))
        .filter_map(|l| l.split_whitespace().next())
        .map(str::to_lowercase)
        .collect()
}

/// The SDK for a release channel
#[derive(Debug, Clone)]
pub struct DotnetSdk {
    pub env: DotnetEnv,
    pub channel: String,
    pub method: RuntimeMethod,
    pub bootstrap_url: String,
    pub bootstrap_sha256: Option<String>,
    pub install_dir: PathBuf,
    pub sdk_package: String,
}

impl DotnetSdk {
    async fn install_with_script(&self, host: &HostContext) -> Result<()> {
        let script = host.downloader.download(&self.bootstrap_url).await?;
        match &self.bootstrap_sha256 {
            Some(expected) => script.verify_sha256(expected)?,
            None => debug!("Bootstrap script sha256 {} (not pinned)", script.sha256()),
        }

        info!(
            "Running bootstrap script for channel {} into {}",
            self.channel,
            self.install_dir.display()
        );
        host.exec
            .execute(&format!(
                "bash {} --channel {} --install-dir {}",
                shell_quote(&script.path().to_string_lossy()),
                shell_quote(&self.channel),
                shell_quote(&self.install_dir.to_string_lossy())
            ))
            .await
    }

    async fn install_from_repository(&self, host: &HostContext) -> Result<()> {
        host.platform
            .add_repository(host.exec.as_ref(), host.downloader.as_ref())
            .await?;
        host.platform
            .install_packages(host.exec.as_ref(), &[self.sdk_package.clone()])
            .await
    }
}

#[async_trait::async_trait]
impl Resource for DotnetSdk {
    fn id(&self) -> String {
        format!("dotnet-sdk:{}", self.channel)
    }

    fn kind(&self) -> &'static str {
        "dotnet-sdk"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let sdks = host
            .exec
            .execute_with_output(&format!("{} 2>/dev/null || true", self.env.command("--list-sdks")))
            .await?;
        Ok(if sdk_matches_channel(&sdks, &self.channel) {
            ResourceState::Converged
        } else if sdks.trim().is_empty() {
            ResourceState::Missing
        } else {
            ResourceState::Drifted(format!("no {} SDK among installed SDKs", self.channel))
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        match self.method {
            RuntimeMethod::Script => self.install_with_script(host).await,
            RuntimeMethod::Repository => self.install_from_repository(host).await,
        }
    }
}

/// A global dotnet tool, checked by package id
#[derive(Debug, Clone)]
pub struct GlobalTool {
    pub env: DotnetEnv,
    pub name: String,
}

#[async_trait::async_trait]
impl Resource for GlobalTool {
    fn id(&self) -> String {
        format!("dotnet-tool:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "dotnet-tool"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Warn
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let list = host
            .exec
            .execute_with_output(&format!("{} 2>/dev/null || true", self.env.command("tool list -g")))
            .await?;
        let wanted = self.name.to_lowercase();
        Ok(if installed_tools(&list).contains(&wanted) {
            ResourceState::Converged
        } else {
            ResourceState::Missing
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.exec
            .execute_with_output(&self.env.command(&format!(
                "tool install --global {}",
                shell_quote(&self.name)
            )))
            .await
            .map(|_| ())
    }
}

/// A project created from a template, with a fallback template
#[derive(Debug, Clone)]
pub struct ProjectScaffold {
    pub env: DotnetEnv,
    pub dir: PathBuf,
    pub name: String,
    pub template: String,
    pub fallback: String,
}

impl ProjectScaffold {
    pub fn project_dir(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn project_file(&self) -> PathBuf {
        self.project_dir().join(format!("{}.csproj", self.name))
    }

    fn new_command(&self, template: &str, force: bool) -> String {
        let args = format!(
            "new {} -n {} -o {}{}",
            shell_quote(template),
            shell_quote(&self.name),
            shell_quote(&self.project_dir().to_string_lossy()),
            if force { " --force" } else { "" }
        );
        self.env.command(&args)
    }
}

#[async_trait::async_trait]
impl Resource for ProjectScaffold {
    fn id(&self) -> String {
        format!("project:{}", self.project_dir().display())
    }

    fn kind(&self) -> &'static str {
        "project"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let exists = host
            .exec
            .check_silent(&format!(
                "test -f {}",
                shell_quote(&self.project_file().to_string_lossy())
            ))
            .await?;
        Ok(if exists {
            ResourceState::Converged
        } else {
            ResourceState::Missing
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.exec
            .execute_with_output(&format!(
                "mkdir -p {}",
                shell_quote(&self.dir.to_string_lossy())
            ))
            .await?;

        let primary = host
            .exec
            .execute_with_error_collection(
                &self.new_command(&self.template, false),
                &format!("dotnet new {}", self.template),
            )
            .await?;
        if primary.success() {
            return Ok(());
        }

        warn!(
            "⚠ Template '{}' failed ({}), falling back to '{}'",
            self.template,
            primary.stderr.trim(),
            self.fallback
        );
        host.exec
            .execute_with_output(&self.new_command(&self.fallback, true))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_matches_channel() {
        let list = "6.0.428 [/home/dev/.dotnet/sdk]\n8.0.404 [/home/dev/.dotnet/sdk]\n";
        assert!(sdk_matches_channel(list, "8.0"));
        assert!(sdk_matches_channel(list, "6.0"));
        assert!(!sdk_matches_channel(list, "9.0"));
        assert!(!sdk_matches_channel("", "8.0"));
        // 18.0 must not satisfy 8.0
        assert!(!sdk_matches_channel("18.0.100 [/x]\n", "8.0"));
    }

    #[test]
    fn test_installed_tools_parses_table() {
        let output = "Package Id                 Version      Commands\n\
                      ------------------------------------------------------\n\
                      dotnet-ef                  8.0.11       dotnet-ef\n\
                      Dotnet-Outdated-Tool       4.6.4        dotnet-outdated\n";
        let tools = installed_tools(output);
        assert_eq!(tools, vec!["dotnet-ef", "dotnet-outdated-tool"]);
    }

    #[test]
    fn test_prefix_with_root() {
        let env = DotnetEnv {
            root: Some(PathBuf::from("/home/dev/.dotnet")),
            tools_dir: PathBuf::from("/home/dev/.dotnet/tools"),
        };
        let cmd = env.command("--version");
        assert!(cmd.contains("export DOTNET_ROOT=/home/dev/.dotnet;"));
        assert!(cmd.contains("PATH=/home/dev/.dotnet:/home/dev/.dotnet/tools:"));
        assert!(cmd.ends_with("dotnet --version"));
    }

    #[test]
    fn test_scaffold_paths() {
        let scaffold = ProjectScaffold {
            env: DotnetEnv {
                root: None,
                tools_dir: PathBuf::from("/home/dev/.dotnet/tools"),
            },
            dir: PathBuf::from("/home/dev/projects"),
            name: "SampleApi".to_string(),
            template: "webapi".to_string(),
            fallback: "web".to_string(),
        };
        assert_eq!(
            scaffold.project_file(),
            PathBuf::from("/home/dev/projects/SampleApi/SampleApi.csproj")
        );
        assert!(scaffold.new_command("web", true).ends_with("--force"));
    }
}
