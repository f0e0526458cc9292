// file: src/config/mod.rs
// version: 2.0.0
// guid: a1b2c3d4-e5f6-7a8b-9c0d-1e2f3a4b5c6d

//! Configuration module for the host provisioner
//!
//! Every field has a default, so the tool runs without any configuration
//! file. A YAML or TOML file may override any subset of the settings.

pub mod distro;
pub mod loader;

pub use distro::{DistroDescriptor, DistroFamily, OS_RELEASE_PATH};
pub use loader::ConfigLoader;

use crate::error::ProvisionError;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which pipeline variant runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    Development,
    Production,
}

/// How the .NET SDK is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMethod {
    /// Vendor bootstrap script into a per-user directory
    Script,
    /// Vendor package repository through apt
    Repository,
}

/// What happens to database passwords on a re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPolicy {
    /// Reuse the passwords recorded in the password file
    Preserve,
    /// Generate fresh passwords and re-apply them
    Rotate,
}

/// Per-run switches coming from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: InstallMode,
    pub runtime_method: RuntimeMethod,
    pub credential_policy: CredentialPolicy,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: InstallMode::Development,
            runtime_method: RuntimeMethod::Script,
            credential_policy: CredentialPolicy::Preserve,
            dry_run: false,
        }
    }
}

/// Top-level provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvisionConfig {
    pub runtime: RuntimeConfig,
    pub packages: PackageList,
    pub tools: ToolList,
    pub database: DatabaseConfig,
    pub production: ProductionConfig,
    pub scaffold: ScaffoldConfig,
    pub network: NetworkConfig,
}

/// .NET SDK settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// SDK channel, e.g. `8.0`
    pub channel: String,
    /// Install directory used by the bootstrap script
    pub install_dir: String,
    pub bootstrap_url: String,
    /// Optional pinned SHA-256 of the bootstrap script
    pub bootstrap_sha256: Option<String>,
    /// apt package used with the repository method
    pub sdk_package: String,
    /// Shell profile receiving PATH exports
    pub profile_file: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel: "8.0".to_string(),
            install_dir: "~/.dotnet".to_string(),
            bootstrap_url: "https://dot.net/v1/dotnet-install.sh".to_string(),
            bootstrap_sha256: None,
            sdk_package: "dotnet-sdk-8.0".to_string(),
            profile_file: "~/.bashrc".to_string(),
        }
    }
}

/// OS packages installed by the package stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageList(pub Vec<String>);

impl Default for PackageList {
    fn default() -> Self {
        Self(
            [
                "curl",
                "wget",
                "git",
                "unzip",
                "jq",
                "build-essential",
                "ca-certificates",
                "gnupg",
                "apt-transport-https",
                "lsb-release",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }
}

/// Global dotnet tools installed by the tool stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolList(pub Vec<String>);

impl Default for ToolList {
    fn default() -> Self {
        Self(
            ["dotnet-ef", "dotnet-outdated-tool", "dotnet-aspnet-codegenerator"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// PostgreSQL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub name: String,
    pub admin_user: String,
    pub app_user: String,
    pub host: String,
    pub port: u16,
    pub listen_addresses: String,
    pub password_length: usize,
    /// Per-user password file in `host:port:db:user:password` format
    pub pgpass_file: String,
    /// Human readable credential reference
    pub credentials_file: String,
    pub auth_method: String,
    pub packages: Vec<String>,
    pub service: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "appdb".to_string(),
            admin_user: "postgres".to_string(),
            app_user: "appuser".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            listen_addresses: "localhost".to_string(),
            password_length: 32,
            pgpass_file: "~/.pgpass".to_string(),
            credentials_file: "~/.config/devhost/database-credentials.txt".to_string(),
            auth_method: "scram-sha-256".to_string(),
            packages: vec!["postgresql".to_string(), "postgresql-contrib".to_string()],
            service: "postgresql".to_string(),
        }
    }
}

/// Settings used only with `--production`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// ufw rule specifications, e.g. `OpenSSH` or `443/tcp`
    pub firewall_rules: Vec<String>,
    pub environment_file: String,
    pub environment: BTreeMap<String, String>,
    pub nginx_site: String,
    pub server_name: String,
    pub upstream_port: u16,
    pub sysctl_file: String,
    pub sysctl: BTreeMap<String, String>,
    pub limits_file: String,
    pub limits_user: String,
    pub nofile_limit: u64,
    pub nproc_limit: u64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        let environment = [
            ("ASPNETCORE_ENVIRONMENT", "Production"),
            ("DOTNET_CLI_TELEMETRY_OPTOUT", "1"),
            ("DOTNET_PRINT_TELEMETRY_MESSAGE", "false"),
        ];
        let sysctl = [
            ("fs.file-max", "2097152"),
            ("net.core.somaxconn", "65535"),
            ("net.core.netdev_max_backlog", "16384"),
            ("net.ipv4.tcp_max_syn_backlog", "8192"),
            ("net.ipv4.ip_local_port_range", "1024 65535"),
            ("net.ipv4.tcp_fin_timeout", "15"),
            ("net.ipv4.tcp_tw_reuse", "1"),
            ("vm.swappiness", "10"),
        ];
        Self {
            firewall_rules: vec![
                "OpenSSH".to_string(),
                "80/tcp".to_string(),
                "443/tcp".to_string(),
            ],
            environment_file: "/etc/environment".to_string(),
            environment: environment
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            nginx_site: "dotnet-app".to_string(),
            server_name: "_".to_string(),
            upstream_port: 5000,
            sysctl_file: "/etc/sysctl.d/99-devhost.conf".to_string(),
            sysctl: sysctl
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            limits_file: "/etc/security/limits.d/99-devhost.conf".to_string(),
            limits_user: "*".to_string(),
            nofile_limit: 65535,
            nproc_limit: 65535,
        }
    }
}

/// Sample project settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub projects_dir: String,
    pub project_name: String,
    pub template: String,
    pub fallback_template: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            projects_dir: "~/projects".to_string(),
            project_name: "SampleApi".to_string(),
            template: "webapi".to_string(),
            fallback_template: "web".to_string(),
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub download_timeout_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            download_timeout_seconds: 300,
        }
    }
}

impl ProvisionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let ident = Regex::new(r"^[a-z_][a-z0-9_]*$")
            .map_err(|e| ProvisionError::config(format!("Invalid regex pattern: {}", e)))?;

        for (field, value) in [
            ("database.name", &self.database.name),
            ("database.admin_user", &self.database.admin_user),
            ("database.app_user", &self.database.app_user),
        ] {
            if !ident.is_match(value) {
                return Err(ProvisionError::validation(format!(
                    "{} must match [a-z_][a-z0-9_]*, got '{}'",
                    field, value
                )));
            }
        }

        if self.database.admin_user == self.database.app_user {
            return Err(ProvisionError::validation(
                "database.admin_user and database.app_user must differ",
            ));
        }

        if !(16..=128).contains(&self.database.password_length) {
            return Err(ProvisionError::validation(format!(
                "database.password_length must be between 16 and 128, got {}",
                self.database.password_length
            )));
        }

        if self.database.port == 0 || self.production.upstream_port == 0 {
            return Err(ProvisionError::validation("Ports must be non-zero"));
        }

        url::Url::parse(&self.runtime.bootstrap_url).map_err(|e| {
            ProvisionError::validation(format!(
                "runtime.bootstrap_url '{}' is not a valid URL: {}",
                self.runtime.bootstrap_url, e
            ))
        })?;

        if let Some(sum) = &self.runtime.bootstrap_sha256 {
            if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ProvisionError::validation(
                    "runtime.bootstrap_sha256 must be 64 hex characters",
                ));
            }
        }

        let name = &self.scaffold.project_name;
        if name.is_empty() || name.contains('/') || name.starts_with('.') {
            return Err(ProvisionError::validation(format!(
                "scaffold.project_name must be a plain directory name, got '{}'",
                name
            )));
        }

        if self.runtime.channel.is_empty() {
            return Err(ProvisionError::validation("runtime.channel cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ProvisionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.password_length, 32);
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn test_rejects_bad_identifier() {
        let mut config = ProvisionConfig::default();
        config.database.app_user = "app-user; drop".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database.app_user"));
    }

    #[test]
    fn test_rejects_same_users() {
        let mut config = ProvisionConfig::default();
        config.database.app_user = "postgres".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_short_passwords() {
        let mut config = ProvisionConfig::default();
        config.database.password_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut config = ProvisionConfig::default();
        config.runtime.bootstrap_sha256 = Some("abc".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nested_project_name() {
        let mut config = ProvisionConfig::default();
        config.scaffold.project_name = "../escape".to_string();
        assert!(config.validate().is_err());
    }
}
