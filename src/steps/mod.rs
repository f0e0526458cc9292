// file: src/steps/mod.rs
// version: 2.0.0
// guid: h8i9j0k1-l2m3-4567-8901-bcdef234567

//! Pipeline stages
//!
//! Stages run strictly in order and share one [`RunContext`]. A stage
//! declares resources and hands them to the context's reconciler; the
//! orchestrator measures the stage and turns its outcome into a
//! [`StageResult`].

pub mod database;
pub mod hardening;
pub mod packages;
pub mod probe;
pub mod runtime;
pub mod scaffold;
pub mod tools;

pub use database::DatabaseStage;
pub use hardening::HardeningStage;
pub use packages::PackageStage;
pub use probe::{EnvironmentProbe, ProbeFindings};
pub use runtime::RuntimeStage;
pub use scaffold::ScaffoldStage;
pub use tools::ToolStage;

use crate::config::{ProvisionConfig, RunOptions, RuntimeMethod};
use crate::error::ProvisionError;
use crate::network::HostIdentity;
use crate::resource::{ConvergeSummary, DotnetEnv, HostContext, Reconciler};
use crate::security::Credentials;
use crate::utils::SystemUtils;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Configured paths with `~` expanded against the invoking user's home
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPaths {
    pub dotnet_root: PathBuf,
    pub dotnet_tools: PathBuf,
    pub profile_file: PathBuf,
    pub pgpass_file: PathBuf,
    pub credentials_file: PathBuf,
    pub projects_dir: PathBuf,
}

impl ResolvedPaths {
    pub fn resolve(config: &ProvisionConfig, identity: &HostIdentity) -> Self {
        let home = identity.home.as_path();
        let dotnet_root = SystemUtils::expand_home(&config.runtime.install_dir, home);
        Self {
            dotnet_tools: home.join(".dotnet").join("tools"),
            dotnet_root,
            profile_file: SystemUtils::expand_home(&config.runtime.profile_file, home),
            pgpass_file: SystemUtils::expand_home(&config.database.pgpass_file, home),
            credentials_file: SystemUtils::expand_home(&config.database.credentials_file, home),
            projects_dir: SystemUtils::expand_home(&config.scaffold.projects_dir, home),
        }
    }
}

/// State shared by every stage of one run
pub struct RunContext {
    pub host: HostContext,
    pub config: ProvisionConfig,
    pub options: RunOptions,
    pub identity: HostIdentity,
    pub paths: ResolvedPaths,
    pub reconciler: Reconciler,
    /// Set by the database stage
    pub credentials: Option<Credentials>,
    /// Component versions reported by verification commands
    pub versions: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new(
        host: HostContext,
        config: ProvisionConfig,
        options: RunOptions,
        identity: HostIdentity,
    ) -> Self {
        let paths = ResolvedPaths::resolve(&config, &identity);
        Self {
            host,
            config,
            reconciler: Reconciler::new(options.dry_run),
            options,
            identity,
            paths,
            credentials: None,
            versions: BTreeMap::new(),
        }
    }

    /// Environment prefix for dotnet commands on this host
    pub fn dotnet_env(&self) -> DotnetEnv {
        DotnetEnv {
            root: match self.options.runtime_method {
                RuntimeMethod::Script => Some(self.paths.dotnet_root.clone()),
                RuntimeMethod::Repository => None,
            },
            tools_dir: self.paths.dotnet_tools.clone(),
        }
    }

    /// Run a verification command, failing when it exits non-zero
    ///
    /// Returns trimmed stdout. Skipped in dry-run mode, where nothing was
    /// installed that could be verified.
    pub async fn verify(&self, what: &str, command: &str) -> Result<Option<String>> {
        if self.options.dry_run {
            info!("DRY RUN: skipping verification of {}", what);
            return Ok(None);
        }
        let output = self
            .host
            .exec
            .execute_with_error_collection(command, what)
            .await?;
        if !output.success() {
            return Err(ProvisionError::verification(format!(
                "{} (exit code {}): {}",
                what,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        let stdout = output.stdout.trim().to_string();
        debug!("Verified {}: {}", what, stdout);
        Ok(Some(stdout))
    }
}

/// Status of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

/// Result of running one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub name: String,
    pub status: StageStatus,
    pub summary: ConvergeSummary,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

impl StageResult {
    pub fn completed(name: &str, summary: ConvergeSummary, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: StageStatus::Completed,
            summary,
            elapsed_secs: elapsed.as_secs_f64(),
            error: None,
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StageStatus::Skipped,
            summary: ConvergeSummary::default(),
            elapsed_secs: 0.0,
            error: None,
        }
    }

    pub fn failed(name: &str, error: &ProvisionError, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: StageStatus::Failed,
            summary: ConvergeSummary::default(),
            elapsed_secs: elapsed.as_secs_f64(),
            error: Some(error.to_string()),
        }
    }
}

/// One stage of the provisioning pipeline
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Whether the stage takes part in this run
    fn enabled(&self, _ctx: &RunContext) -> bool {
        true
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary>;
}

/// Stages in execution order
pub fn pipeline() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(PackageStage),
        Box::new(RuntimeStage),
        Box::new(ToolStage),
        Box::new(DatabaseStage),
        Box::new(HardeningStage),
        Box::new(ScaffoldStage),
    ]
}
