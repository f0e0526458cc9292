// file: src/error.rs
// version: 3.0.0
// guid: 57b83a63-07b6-4534-aa6c-51e8797254e0

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Error types for the host provisioner
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Unsupported distribution: {0}")]
    UnsupportedDistro(String),

    #[error("Command '{command}' failed (exit code {exit_code:?}): {stderr}")]
    ProcessError {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Interrupted: {0}")]
    Interrupted(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ProvisionError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new permission error
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a new unsupported distribution error
    pub fn unsupported_distro(msg: impl Into<String>) -> Self {
        Self::UnsupportedDistro(msg.into())
    }

    /// Create a new process error
    pub fn process(command: impl Into<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ProcessError {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a new verification error
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for failures detected before any host mutation
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::Permission(_) | Self::UnsupportedDistro(_) | Self::Config(_) | Self::Validation(_)
        )
    }
}
