// file: src/platform/apt.rs
// version: 1.0.0
// guid: c84e1f0a-93b2-4d57-a6e8-0f25b7d31c99

//! apt, systemd and ufw helpers shared by the Debian-family platforms

use super::ServiceAction;
use crate::network::CommandExecutor;
use crate::utils::shell_quote;
use crate::Result;
use std::path::Path;
use tracing::{debug, info};

const APT_ENV: &str = "sudo DEBIAN_FRONTEND=noninteractive";

/// Whether dpkg reports the package as installed
pub async fn package_installed(exec: &dyn CommandExecutor, package: &str) -> Result<bool> {
    let cmd = format!(
        "dpkg-query -W -f='${{Status}}' {} 2>/dev/null | grep -q 'install ok installed'",
        shell_quote(package)
    );
    exec.check_silent(&cmd).await
}

pub async fn update(exec: &dyn CommandExecutor) -> Result<()> {
    info!("Updating package lists");
    exec.execute(&format!("{} apt-get update -y", APT_ENV)).await
}

pub async fn install(exec: &dyn CommandExecutor, packages: &[String]) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }
    info!("Installing packages: {}", packages.join(" "));
    let quoted: Vec<String> = packages.iter().map(|p| shell_quote(p)).collect();
    exec.execute(&format!(
        "{} apt-get install -y --no-install-recommends {}",
        APT_ENV,
        quoted.join(" ")
    ))
    .await
}

/// Install a downloaded `.deb` file
pub async fn install_local_deb(exec: &dyn CommandExecutor, path: &Path) -> Result<()> {
    exec.execute(&format!(
        "{} dpkg -i {}",
        APT_ENV,
        shell_quote(&path.to_string_lossy())
    ))
    .await
}

pub async fn systemd_active(exec: &dyn CommandExecutor, service: &str) -> Result<bool> {
    let service = shell_quote(service);
    exec.check_silent(&format!(
        "systemctl is-enabled --quiet {0} && systemctl is-active --quiet {0}",
        service
    ))
    .await
}

pub async fn systemd(exec: &dyn CommandExecutor, service: &str, action: ServiceAction) -> Result<()> {
    debug!("systemctl {} {}", action.as_str(), service);
    exec.execute(&format!(
        "sudo systemctl {} {}",
        action.as_str(),
        shell_quote(service)
    ))
    .await
}

pub async fn ufw_rule_present(exec: &dyn CommandExecutor, rule: &str) -> Result<bool> {
    let status = exec
        .execute_with_output("sudo ufw show added 2>/dev/null || true")
        .await?;
    Ok(ufw_added_contains(&status, rule))
}

pub async fn ufw_allow(exec: &dyn CommandExecutor, rule: &str) -> Result<()> {
    exec.execute(&format!("sudo ufw allow {}", shell_quote(rule)))
        .await
}

pub async fn ufw_active(exec: &dyn CommandExecutor) -> Result<bool> {
    exec.check_silent("sudo ufw status | grep -q '^Status: active'")
        .await
}

pub async fn ufw_enable(exec: &dyn CommandExecutor) -> Result<()> {
    exec.execute("sudo ufw --force enable").await
}

/// Match a rule against `ufw show added` output (`ufw allow 443/tcp` lines)
pub fn ufw_added_contains(output: &str, rule: &str) -> bool {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("ufw allow "))
        .any(|added| added.trim() == rule || added.trim() == format!("'{}'", rule))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ufw_added_contains() {
        let output = "Added user rules (see 'ufw status' for running firewall):\n\
                      ufw allow OpenSSH\n\
                      ufw allow 80/tcp\n";
        assert!(ufw_added_contains(output, "OpenSSH"));
        assert!(ufw_added_contains(output, "80/tcp"));
        assert!(!ufw_added_contains(output, "443/tcp"));
        assert!(!ufw_added_contains("(None)", "80/tcp"));
    }
}
