// file: src/main.rs
// version: 2.0.0
// guid: h8i9j0k1-l2m3-4567-8901-234567hijklm

//! devhost-provisioner - Main entry point

use clap::{error::ErrorKind, Parser};
use devhost_provisioner::{
    cli::{provision_command, Cli},
    logging::init_logger,
    ProvisionError, Result,
};
use std::process::ExitCode;
use tokio::signal::{
    self,
    unix::{signal as unix_signal, SignalKind},
};
use tokio::task::JoinError;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = init_logger(false, false, None);
            error!("{}", e.to_string().trim_end());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logger(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let mut sigterm = match unix_signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run the pipeline as its own task so a signal can abort it; aborting
    // drops in-flight downloads and kills child processes.
    let mut pipeline = tokio::spawn(provision_command(cli));

    let (signal_name, code) = tokio::select! {
        joined = &mut pipeline => return finish(joined),
        _ = signal::ctrl_c() => ("SIGINT", 130u8),
        _ = sigterm.recv() => ("SIGTERM", 143u8),
    };

    pipeline.abort();
    let _ = pipeline.await;
    error!(
        "{}",
        ProvisionError::Interrupted(format!(
            "received {}; steps already completed are left in place",
            signal_name
        ))
    );
    ExitCode::from(code)
}

fn finish(joined: std::result::Result<Result<()>, JoinError>) -> ExitCode {
    match joined {
        Ok(Ok(())) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Provisioning task ended unexpectedly: {}", e);
            ExitCode::FAILURE
        }
    }
}
