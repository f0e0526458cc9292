// file: src/cli/args.rs
// version: 2.0.0
// guid: f6g7h8i9-j0k1-2345-6789-012345fghijk

//! Command line argument definitions

use crate::config::{CredentialPolicy, InstallMode, RunOptions, RuntimeMethod};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "devhost-provisioner")]
#[command(about = "Provision a .NET development or production host with PostgreSQL")]
#[command(
    long_about = "Provision a .NET development or production host with PostgreSQL.\n\n\
    Every step observes the host first and only changes what differs, so the \
    tool can be re-run safely. Without flags a development host is set up."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Also apply production hardening: firewall, nginx reverse proxy, kernel and resource limits
    #[arg(long)]
    pub production: bool,

    /// Install the SDK from the vendor package repository instead of the bootstrap script
    #[arg(long)]
    pub repo_method: bool,

    /// YAML or TOML configuration file (TOML when the name ends in .toml)
    #[arg(short, long, value_name = "PATH", env = "DEVHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate new database passwords even if earlier ones are recorded
    #[arg(long)]
    pub rotate_credentials: bool,

    /// Also write the run report as JSON
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Also write plain-text logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: if self.production {
                InstallMode::Production
            } else {
                InstallMode::Development
            },
            runtime_method: if self.repo_method {
                RuntimeMethod::Repository
            } else {
                RuntimeMethod::Script
            },
            credential_policy: if self.rotate_credentials {
                CredentialPolicy::Rotate
            } else {
                CredentialPolicy::Preserve
            },
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_is_development() {
        let cli = Cli::try_parse_from(["devhost-provisioner"]).unwrap();
        assert_eq!(cli.run_options(), RunOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "devhost-provisioner",
            "--production",
            "--repo-method",
            "--rotate-credentials",
            "--dry-run",
        ])
        .unwrap();
        let options = cli.run_options();
        assert_eq!(options.mode, InstallMode::Production);
        assert_eq!(options.runtime_method, RuntimeMethod::Repository);
        assert_eq!(options.credential_policy, CredentialPolicy::Rotate);
        assert!(options.dry_run);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Cli::try_parse_from(["devhost-provisioner", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["devhost-provisioner", "-v", "-q"]).is_err());
    }
}
