// file: src/network/local.rs
// version: 2.0.0
// guid: local001-2345-6789-abcd-ef0123456789

//! Local command execution for on-machine provisioning

use super::executor::{CommandExecutor, CommandOutput, HostIdentity};
use crate::error::ProvisionError;
use crate::utils::{shell_quote, SystemUtils};
use crate::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Local command executor running everything through `bash -c`
#[derive(Debug, Default)]
pub struct LocalClient;

impl LocalClient {
    /// Create a new local client
    pub fn new() -> Self {
        Self
    }

    fn bash(command: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command).kill_on_drop(true);
        cmd
    }

    async fn run(command: &str, input: Option<&str>) -> Result<Output> {
        let mut cmd = Self::bash(command);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| {
            ProvisionError::process(command, None, format!("Failed to execute command: {}", e))
        })?;

        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await?;
            }
        }

        child.wait_with_output().await.map_err(|e| {
            ProvisionError::process(command, None, format!("Failed to wait for command: {}", e))
        })
    }

    fn failure(command: &str, output: &Output) -> ProvisionError {
        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        debug!("Command failed with exit code {:?}", exit_code);
        if !stdout.trim().is_empty() {
            debug!("STDOUT: {}", stdout);
        }
        if !stderr.trim().is_empty() {
            debug!("STDERR: {}", stderr.trim());
        }

        ProvisionError::process(
            command,
            exit_code,
            if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            },
        )
    }
}

#[async_trait::async_trait]
impl CommandExecutor for LocalClient {
    async fn identity(&self) -> Result<HostIdentity> {
        Ok(HostIdentity {
            user: SystemUtils::current_user(),
            uid: SystemUtils::effective_uid(),
            home: SystemUtils::home_dir(),
        })
    }

    async fn command_exists(&self, name: &str) -> bool {
        SystemUtils::command_exists(name)
    }

    async fn execute(&self, command: &str) -> Result<()> {
        debug!("Executing local command: {}", command);

        // Inherit the terminal so long package operations show progress and
        // sudo can prompt.
        let status = Self::bash(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                ProvisionError::process(command, None, format!("Failed to execute command: {}", e))
            })?;

        if !status.success() {
            debug!("Command failed with exit code {:?}: {}", status.code(), command);
            return Err(ProvisionError::process(
                command,
                status.code(),
                "see output above",
            ));
        }

        debug!("Command executed successfully");
        Ok(())
    }

    async fn execute_with_output(&self, command: &str) -> Result<String> {
        debug!("Executing local command with output: {}", command);

        let output = Self::run(command, None).await?;
        if !output.status.success() {
            return Err(Self::failure(command, &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn execute_with_input(&self, command: &str, input: &str) -> Result<String> {
        debug!("Executing local command with stdin: {}", command);

        let output = Self::run(command, Some(input)).await?;
        if !output.status.success() {
            return Err(Self::failure(command, &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn execute_with_error_collection(
        &self,
        command: &str,
        description: &str,
    ) -> Result<CommandOutput> {
        info!("Executing: {} -> {}", description, command);

        let output = Self::run(command, None).await?;
        let collected = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if collected.success() {
            debug!("Command '{}' completed successfully", description);
        } else {
            debug!(
                "Command '{}' exited with {}: {}",
                description,
                collected.exit_code,
                collected.stderr.trim()
            );
        }

        Ok(collected)
    }

    async fn check_silent(&self, command: &str) -> Result<bool> {
        let output = Self::run(command, None).await?;
        Ok(output.status.success())
    }

    async fn read_file(&self, path: &Path, privileged: bool) -> Result<Option<String>> {
        if privileged {
            let quoted = shell_quote(&path.to_string_lossy());
            if !self.check_silent(&format!("sudo test -e {}", quoted)).await? {
                return Ok(None);
            }
            let content = self
                .execute_with_output(&format!("sudo cat {}", quoted))
                .await?;
            return Ok(Some(content));
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        mode: u32,
        privileged: bool,
    ) -> Result<()> {
        debug!("Writing {} (mode {:o})", path.display(), mode);

        if privileged {
            let quoted = shell_quote(&path.to_string_lossy());
            if let Some(parent) = path.parent() {
                self.execute_with_output(&format!(
                    "sudo install -d -m 755 {}",
                    shell_quote(&parent.to_string_lossy())
                ))
                .await?;
            }
            self.execute_with_input(&format!("sudo tee {} > /dev/null", quoted), content)
                .await?;
            self.execute_with_output(&format!("sudo chmod {:o} {}", mode, quoted))
                .await?;
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(mode)
            .open(path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
        Ok(())
    }
}
