// file: src/network/executor.rs
// version: 2.0.0
// guid: exec0001-2345-6789-abcd-ef0123456789

//! Command execution trait for host access

use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Who the provisioner runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub user: String,
    pub uid: u32,
    pub home: PathBuf,
}

impl HostIdentity {
    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

/// Captured result of a command that is allowed to fail
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for every interaction with the host being provisioned
///
/// Commands are `bash -c` strings. Files are addressed by absolute path;
/// `privileged` routes the access through sudo.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Identity of the invoking user
    async fn identity(&self) -> Result<HostIdentity>;

    /// Check whether a binary is on PATH
    async fn command_exists(&self, name: &str) -> bool;

    /// Execute command, failing on non-zero exit
    async fn execute(&self, command: &str) -> Result<()>;

    /// Execute command and return stdout
    async fn execute_with_output(&self, command: &str) -> Result<String>;

    /// Execute command feeding `input` on stdin, return stdout
    async fn execute_with_input(&self, command: &str, input: &str) -> Result<String>;

    /// Execute command and collect exit code and both streams without failing
    async fn execute_with_error_collection(
        &self,
        command: &str,
        description: &str,
    ) -> Result<CommandOutput>;

    /// Execute a command intended as a boolean check
    async fn check_silent(&self, command: &str) -> Result<bool>;

    /// Read a file, `None` when it does not exist
    async fn read_file(&self, path: &Path, privileged: bool) -> Result<Option<String>>;

    /// Create or replace a file with the given content and mode
    async fn write_file(&self, path: &Path, content: &str, mode: u32, privileged: bool)
        -> Result<()>;
}
