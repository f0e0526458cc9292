// file: src/reporter/mod.rs
// version: 2.0.0
// guid: j0k1l2m3-n4o5-6789-0123-def456789012

//! Run report: what ran, what changed, where the credentials are

use crate::config::{DistroDescriptor, InstallMode, RunOptions, RuntimeMethod};
use crate::steps::{StageResult, StageStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::info;
use uuid::Uuid;

/// Facts about the machine, gathered once per run
#[derive(Debug, Clone, Serialize)]
pub struct HostFacts {
    pub hostname: Option<String>,
    pub kernel_version: Option<String>,
    pub os_version: Option<String>,
    pub total_memory_bytes: u64,
    pub cpu_count: usize,
}

impl HostFacts {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        Self {
            hostname: System::host_name(),
            kernel_version: System::kernel_version(),
            os_version: System::long_os_version(),
            total_memory_bytes: sys.total_memory(),
            cpu_count: sys.cpus().len(),
        }
    }
}

/// Database connection details without secrets
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub database: String,
    pub app_username: String,
    pub admin_username: String,
    pub pgpass_file: PathBuf,
    pub credentials_file: PathBuf,
}

/// Everything one run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub mode: InstallMode,
    pub runtime_method: RuntimeMethod,
    pub dry_run: bool,
    pub distro: Option<DistroDescriptor>,
    pub host: HostFacts,
    pub stages: Vec<StageResult>,
    pub versions: BTreeMap<String, String>,
    pub database: Option<DatabaseSummary>,
    pub success: bool,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(options: &RunOptions) -> Self {
        let session_id = Uuid::new_v4();
        info!("Starting provisioning session: {}", session_id);
        Self {
            session_id,
            started_at: Utc::now(),
            finished_at: None,
            mode: options.mode,
            runtime_method: options.runtime_method,
            dry_run: options.dry_run,
            distro: None,
            host: HostFacts::collect(),
            stages: Vec::new(),
            versions: BTreeMap::new(),
            database: None,
            success: false,
            error: None,
        }
    }

    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    pub fn finish<T>(&mut self, result: &Result<T>) {
        self.finished_at = Some(Utc::now());
        self.success = result.is_ok();
        self.error = result.as_ref().err().map(|e| e.to_string());
    }

    pub fn completed_stages(&self) -> Vec<&str> {
        self.stages_with(StageStatus::Completed)
    }

    pub fn failed_stages(&self) -> Vec<&str> {
        self.stages_with(StageStatus::Failed)
    }

    fn stages_with(&self, status: StageStatus) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.status == status)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Total number of resources changed across stages
    pub fn changed(&self) -> usize {
        self.stages.iter().map(|s| s.summary.changed()).sum()
    }

    /// Human readable summary
    pub fn render(&self) -> String {
        let mut out = String::new();
        let title = if self.dry_run {
            "Provisioning plan (dry run)"
        } else {
            "Provisioning summary"
        };
        out.push_str(&format!("\n{}\n", title.bold()));
        if let Some(distro) = &self.distro {
            out.push_str(&format!("  Host:    {}\n", distro));
        }
        out.push_str(&format!(
            "  Mode:    {:?} ({:?} runtime)\n",
            self.mode, self.runtime_method
        ));
        out.push_str(&format!("  Session: {}\n\n", self.session_id));

        for stage in &self.stages {
            let marker = match stage.status {
                StageStatus::Completed => "✓".green(),
                StageStatus::Skipped => "-".dimmed(),
                StageStatus::Failed => "✗".red(),
            };
            let s = &stage.summary;
            let mut line = format!(
                "  {} {:<10} {} changed, {} unchanged",
                marker,
                stage.name,
                s.changed(),
                s.unchanged
            );
            if !s.planned.is_empty() {
                line.push_str(&format!(", {} planned", s.planned.len()));
            }
            if !s.warnings.is_empty() {
                line.push_str(&format!(", {}", format!("{} warnings", s.warnings.len()).yellow()));
            }
            if let Some(error) = &stage.error {
                line.push_str(&format!(": {}", error.red()));
            }
            out.push_str(&line);
            out.push('\n');
            for warning in &s.warnings {
                out.push_str(&format!("      {} {}\n", "⚠".yellow(), warning));
            }
        }

        if !self.versions.is_empty() {
            out.push('\n');
            for (component, version) in &self.versions {
                out.push_str(&format!("  {:<10} {}\n", component, version));
            }
        }

        if let Some(db) = &self.database {
            out.push_str(&format!(
                "\n  Database {} (user {}), passwords in {} and {}\n",
                db.database,
                db.app_username,
                db.pgpass_file.display(),
                db.credentials_file.display()
            ));
        }

        let verdict = match (&self.error, self.dry_run) {
            (Some(e), _) => format!("Provisioning failed: {}", e).red().bold(),
            (None, true) => "Dry run complete, nothing was changed".cyan().bold(),
            (None, false) => "Provisioning complete".green().bold(),
        };
        out.push_str(&format!("\n{}\n", verdict));
        out
    }

    /// Print the summary to standard output
    pub fn print_summary(&self) {
        println!("{}", self.render());
    }

    /// Write the report as pretty JSON
    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}
