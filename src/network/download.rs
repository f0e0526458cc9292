// file: src/network/download.rs
// version: 2.0.0
// guid: u1v2w3x4-y5z6-7890-1234-567890uvwxyz

//! Network download utilities
//!
//! Every download lands in a [`TempArtifact`], a temporary file that is
//! deleted when the artifact is dropped. Whether the run finishes, fails or
//! is cancelled, the installer files it fetched do not outlive the scope
//! that fetched them.

use crate::error::ProvisionError;
use crate::utils::CryptoUtils;
use crate::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A downloaded file with scoped lifetime
#[derive(Debug)]
pub struct TempArtifact {
    file: NamedTempFile,
    source: String,
    sha256: String,
}

impl TempArtifact {
    /// Wrap bytes already in memory
    pub fn from_bytes(source: &str, suffix: &str, data: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("devhost-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self {
            file,
            source: source.to_string(),
            sha256: CryptoUtils::sha256_hex(data),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Fail unless the content matches a pinned checksum
    pub fn verify_sha256(&self, expected: &str) -> Result<()> {
        if self.sha256.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(ProvisionError::verification(format!(
                "Checksum mismatch for {}: expected {}, got {}",
                self.source, expected, self.sha256
            )))
        }
    }
}

/// Fetches remote installer artifacts
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<TempArtifact>;
}

/// Network downloader with progress tracking
pub struct NetworkDownloader {
    client: reqwest::Client,
}

impl NetworkDownloader {
    /// Create a new network downloader
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn suffix_for(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .and_then(|name| name.rfind('.').map(|i| name[i..].to_string()))
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Downloader for NetworkDownloader {
    async fn download(&self, url: &str) -> Result<TempArtifact> {
        info!("Downloading: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProvisionError::network(format!(
                "Download of {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| ProvisionError::other(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        let mut data = Vec::with_capacity(total_size as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            data.extend_from_slice(&chunk);
            pb.set_position(data.len() as u64);
        }
        pb.finish_and_clear();

        let artifact = TempArtifact::from_bytes(url, &Self::suffix_for(url), &data)?;
        debug!(
            "Downloaded {} bytes to {} (sha256 {})",
            data.len(),
            artifact.path().display(),
            artifact.sha256()
        );
        Ok(artifact)
    }
}
