// file: src/resource/reconciler.rs
// version: 1.0.0
// guid: 1d6f8b24-e07c-4a3b-95f1-7b4c2e9a0d63

//! Generic observe → apply loop

use super::{BoxedResource, FailurePolicy, HostContext, Resource, ResourceState};
use crate::Result;
use serde::Serialize;
use tracing::{debug, debug_span, info, warn, Instrument};

/// What converging a single resource did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Unchanged,
    Created,
    Updated,
    /// Dry run: would have been applied
    Planned,
    /// Failed under the soft policy
    Suppressed(String),
    /// Failed under the warn policy
    Warned(String),
}

impl Outcome {
    /// True when the host was modified
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Updated)
    }
}

/// Per-stage tally of outcomes
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvergeSummary {
    pub unchanged: usize,
    pub created: usize,
    pub updated: usize,
    pub planned: Vec<String>,
    pub suppressed: usize,
    pub warnings: Vec<String>,
}

impl ConvergeSummary {
    pub fn record(&mut self, id: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Planned => self.planned.push(id.to_string()),
            Outcome::Suppressed(_) => self.suppressed += 1,
            Outcome::Warned(msg) => self.warnings.push(format!("{}: {}", id, msg)),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn changed(&self) -> usize {
        self.created + self.updated
    }
}

/// Drives resources toward their declared state
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    dry_run: bool,
}

impl Reconciler {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Converge one resource
    pub async fn converge(&self, host: &HostContext, resource: &dyn Resource) -> Result<Outcome> {
        let id = resource.id();

        let result = self
            .observe_and_apply(host, resource, &id)
            .instrument(debug_span!("resource", kind = resource.kind(), id = %id))
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => match resource.failure_policy() {
                FailurePolicy::Fatal => Err(e),
                FailurePolicy::Soft => {
                    debug!("Ignoring failure on {}: {}", id, e);
                    Ok(Outcome::Suppressed(e.to_string()))
                }
                FailurePolicy::Warn => {
                    warn!("⚠ {} did not converge: {}", id, e);
                    Ok(Outcome::Warned(e.to_string()))
                }
            },
        }
    }

    async fn observe_and_apply(
        &self,
        host: &HostContext,
        resource: &dyn Resource,
        id: &str,
    ) -> Result<Outcome> {
        let observed = resource.observe(host).await?;
        match observed {
            ResourceState::Converged => {
                info!("✓ {} already in place, skipping", id);
                Ok(Outcome::Unchanged)
            }
            _ if self.dry_run => {
                info!("DRY RUN: would converge {} ({:?})", id, observed);
                Ok(Outcome::Planned)
            }
            ResourceState::Missing => {
                info!("Creating {}", id);
                resource.apply(host, &observed).await?;
                Ok(Outcome::Created)
            }
            ResourceState::Drifted(ref detail) => {
                info!("Updating {} ({})", id, detail);
                resource.apply(host, &observed).await?;
                Ok(Outcome::Updated)
            }
        }
    }

    /// Converge resources in order, recording outcomes; stops at the first fatal error
    pub async fn converge_all(
        &self,
        host: &HostContext,
        resources: &[BoxedResource],
        summary: &mut ConvergeSummary,
    ) -> Result<bool> {
        let mut changed = false;
        for resource in resources {
            let outcome = self.converge(host, resource.as_ref()).await?;
            changed |= outcome.changed();
            summary.record(&resource.id(), &outcome);
        }
        Ok(changed)
    }
}
