// file: src/resource/mod.rs
// version: 1.0.0
// guid: e3a1b5c7-4d92-4f08-a6b3-9c27d0e81f54

//! Desired-state resources
//!
//! Each thing the provisioner manages (a package set, a file, a line in a
//! file, a database role, a service) is a [`Resource`]: it knows how to
//! observe the live host and how to converge it. The [`Reconciler`] drives
//! observe → skip-or-apply generically and applies the resource's
//! [`FailurePolicy`] when something goes wrong.

pub mod dotnet;
pub mod file;
pub mod firewall;
pub mod package;
pub mod postgres;
pub mod reconciler;
pub mod service;

pub use dotnet::{DotnetEnv, DotnetSdk, GlobalTool, ProjectScaffold};
pub use file::{AbsentFile, LineInFile, ManagedFile, Placement, Symlink};
pub use firewall::{FirewallEnabled, FirewallRule};
pub use package::AptPackages;
pub use postgres::{PgDatabase, PgDatabaseGrant, PgPassword, PgRole, Psql};
pub use reconciler::{ConvergeSummary, Outcome, Reconciler};
pub use service::ServiceRunning;

use crate::network::{CommandExecutor, Downloader};
use crate::platform::Platform;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

/// Observed state of a resource relative to its declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResourceState {
    /// Already matches the declaration
    Converged,
    /// Does not exist at all
    Missing,
    /// Exists but differs from the declaration
    Drifted(String),
}

/// How a failure to converge is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailurePolicy {
    /// Abort the run
    Fatal,
    /// Expected noise on re-runs; logged at debug level only
    Soft,
    /// Logged as a warning; the run continues
    Warn,
}

/// Handles to the host being provisioned
#[derive(Clone)]
pub struct HostContext {
    pub exec: Arc<dyn CommandExecutor>,
    pub platform: Arc<dyn Platform>,
    pub downloader: Arc<dyn Downloader>,
}

impl HostContext {
    pub fn new(
        exec: Arc<dyn CommandExecutor>,
        platform: Arc<dyn Platform>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            exec,
            platform,
            downloader,
        }
    }
}

/// A piece of host state with a declared target
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Stable identifier used in logs and reports
    fn id(&self) -> String;

    /// Resource kind, e.g. `file` or `pg-role`
    fn kind(&self) -> &'static str;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }

    /// Inspect the live host
    async fn observe(&self, host: &HostContext) -> Result<ResourceState>;

    /// Converge the host; only called when `observe` did not report `Converged`
    async fn apply(&self, host: &HostContext, observed: &ResourceState) -> Result<()>;
}

/// Boxed resource for heterogeneous lists
pub type BoxedResource = Box<dyn Resource>;
