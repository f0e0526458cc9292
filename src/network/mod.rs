// file: src/network/mod.rs
// version: 2.0.0
// guid: s9t0u1v2-w3x4-5678-9012-345678stuvwx

//! Host access and download module

pub mod download;
pub mod executor;
pub mod local;

pub use download::{Downloader, NetworkDownloader, TempArtifact};
pub use executor::{CommandExecutor, CommandOutput, HostIdentity};
pub use local::LocalClient;
