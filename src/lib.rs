// file: src/lib.rs
// version: 3.0.0
// guid: d82472d1-7f0f-4eb4-b0a3-6e1547103eb4

//! # devhost-provisioner
//!
//! Idempotent provisioning of a .NET host on Ubuntu 24.04 or Debian 13:
//! base packages, the .NET SDK and global tools, PostgreSQL with generated
//! credentials, optional production hardening, and a sample project.
//!
//! Every change is expressed as a desired-state [`resource::Resource`]
//! converged by a [`resource::Reconciler`], so running the tool twice
//! leaves the host unchanged the second time.

pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod logging;
pub mod network;
pub mod platform;
pub mod reporter;
pub mod resource;
pub mod security;
pub mod steps;
pub mod utils;

pub use error::{ProvisionError, Result};

/// Version information for the tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
