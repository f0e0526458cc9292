// file: src/cli/commands.rs
// version: 2.0.0
// guid: g7h8i9j0-k1l2-3456-7890-123456ghijkl

//! Command implementations for the CLI

use crate::{
    cli::Cli,
    config::ConfigLoader,
    installer::Provisioner,
    network::{LocalClient, NetworkDownloader},
    Result,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Provision this host
pub async fn provision_command(cli: Cli) -> Result<()> {
    let options = cli.run_options();
    let config = ConfigLoader::new().load_or_default(cli.config.as_ref())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }
    if options.dry_run {
        info!("DRY RUN: the host will be inspected but not modified");
    }

    let downloader = NetworkDownloader::new(Duration::from_secs(
        config.network.download_timeout_seconds,
    ))?;
    let mut provisioner = Provisioner::new(
        Arc::new(LocalClient::new()),
        Arc::new(downloader),
        config,
        options,
    );

    let result = provisioner.run().await;
    let report = provisioner.into_report();

    if !cli.quiet {
        report.print_summary();
    }
    if let Some(path) = &cli.report_json {
        if let Err(e) = report.write_json(path).await {
            warn!("Could not write report to {}: {}", path.display(), e);
        }
    }

    result
}
