// file: src/installer/mod.rs
// version: 2.0.0
// guid: g7h8i9j0-k1l2-3456-7890-abcdef123456

//! Pipeline orchestrator

use crate::config::{ProvisionConfig, RunOptions};
use crate::logging::{with_async_operation_span, with_operation_span};
use crate::network::{CommandExecutor, Downloader};
use crate::platform::select_platform;
use crate::reporter::{DatabaseSummary, RunReport};
use crate::resource::{ConvergeSummary, HostContext};
use crate::steps::{self, EnvironmentProbe, RunContext, Stage, StageResult};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs the probe and every stage in order
pub struct Provisioner {
    exec: Arc<dyn CommandExecutor>,
    downloader: Arc<dyn Downloader>,
    config: ProvisionConfig,
    options: RunOptions,
    stages: Vec<Box<dyn Stage>>,
    report: RunReport,
}

impl Provisioner {
    pub fn new(
        exec: Arc<dyn CommandExecutor>,
        downloader: Arc<dyn Downloader>,
        config: ProvisionConfig,
        options: RunOptions,
    ) -> Self {
        Self {
            exec,
            downloader,
            config,
            report: RunReport::new(&options),
            options,
            stages: steps::pipeline(),
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Run the whole pipeline, stopping at the first fatal error
    pub async fn run(&mut self) -> Result<()> {
        let result = self.execute().await;
        self.report.finish(&result);

        match &result {
            Ok(()) => info!(
                "Provisioning completed: {} resources changed",
                self.report.changed()
            ),
            Err(e) if e.is_environment() => {
                error!("Provisioning refused: {}", e);
                info!("The host was not modified");
            }
            Err(e) => {
                error!("Provisioning failed: {}", e);
                let completed = self.report.completed_stages();
                error!(
                    "Completed stages: {}",
                    if completed.is_empty() {
                        "none".to_string()
                    } else {
                        completed.join(", ")
                    }
                );
                error!("Failed stage: {}", self.report.failed_stages().join(", "));
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<()> {
        let probe_started = Instant::now();
        let probed = with_async_operation_span(
            EnvironmentProbe::NAME,
            EnvironmentProbe.run(self.exec.as_ref()),
        )
        .await;
        let findings = match probed {
            Ok(findings) => {
                self.report.record(StageResult::completed(
                    EnvironmentProbe::NAME,
                    ConvergeSummary::default(),
                    probe_started.elapsed(),
                ));
                findings
            }
            Err(e) => {
                self.report.record(StageResult::failed(
                    EnvironmentProbe::NAME,
                    &e,
                    probe_started.elapsed(),
                ));
                return Err(e);
            }
        };
        self.report.distro = Some(findings.distro.clone());

        let platform = with_operation_span("select-platform", || select_platform(&findings.distro))?;
        debug!("Selected platform for {}", platform.descriptor());

        let host = HostContext::new(self.exec.clone(), platform, self.downloader.clone());
        let mut ctx = RunContext::new(host, self.config.clone(), self.options, findings.identity);

        let total = self.stages.len();
        for (index, stage) in self.stages.iter().enumerate() {
            if !stage.enabled(&ctx) {
                info!("Skipping stage {}", stage.name());
                self.report.record(StageResult::skipped(stage.name()));
                continue;
            }

            info!("Stage {}/{}: {}", index + 1, total, stage.description());
            let started = Instant::now();
            let outcome = with_async_operation_span(stage.name(), stage.run(&mut ctx)).await;
            match outcome {
                Ok(summary) => {
                    debug!(
                        "Stage {} finished: {} changed, {} unchanged",
                        stage.name(),
                        summary.changed(),
                        summary.unchanged
                    );
                    self.report
                        .record(StageResult::completed(stage.name(), summary, started.elapsed()));
                }
                Err(e) => {
                    self.report
                        .record(StageResult::failed(stage.name(), &e, started.elapsed()));
                    absorb(&mut self.report, &ctx);
                    return Err(e);
                }
            }
        }

        absorb(&mut self.report, &ctx);
        Ok(())
    }
}

/// Copy run outputs into the report
fn absorb(report: &mut RunReport, ctx: &RunContext) {
    report.versions = ctx.versions.clone();
    report.database = ctx.credentials.as_ref().map(|c| DatabaseSummary {
        database: c.database_name.clone(),
        app_username: c.app_username.clone(),
        admin_username: c.admin_username.clone(),
        pgpass_file: ctx.paths.pgpass_file.clone(),
        credentials_file: ctx.paths.credentials_file.clone(),
    });
}
