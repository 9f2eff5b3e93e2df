//! Asset Resolver
//!
//! Maps a memory's stored media reference to a fresh local file the renderer
//! can decode. Bare paths and URLs pointing at this server are copied from
//! disk; any other http(s) URL is downloaded once, with a bounded wait.
//!
//! The copy is always named `<32 hex>.jpg`, whatever the source format.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use url::Url;

use crate::config::AssetConfig;

const USER_AGENT: &str = concat!("relluna-api/", env!("CARGO_PKG_VERSION"));

/// Asset resolution errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// Local reference with no file behind it
    #[error("Local image file not found: {0}")]
    NotFound(String),

    #[error("Timed out fetching {0}")]
    Timeout(String),

    /// Transport failure or non-success status from the remote host
    #[error("Remote fetch failed: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a media reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// Path relative to the local asset root
    Local(PathBuf),
    Remote(String),
}

impl AssetLocation {
    pub fn is_local(&self) -> bool {
        matches!(self, AssetLocation::Local(_))
    }
}

/// Classify a media reference as local or remote
///
/// Local: no scheme/host, or http(s) whose `host:port` is a loopback alias.
pub fn classify(reference: &str, loopback_hosts: &[String]) -> AssetLocation {
    let url = match Url::parse(reference) {
        Ok(url) => url,
        // Relative references ("/uploads/a.jpg", "uploads/a.jpg") have no base
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return AssetLocation::Local(strip_leading_slash(reference));
        }
        Err(_) => return AssetLocation::Remote(reference.to_string()),
    };

    if matches!(url.scheme(), "http" | "https") {
        let authority = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        if loopback_hosts.iter().any(|alias| alias.eq_ignore_ascii_case(&authority)) {
            return AssetLocation::Local(strip_leading_slash(raw_path(reference)));
        }
    }

    AssetLocation::Remote(reference.to_string())
}

/// Path part of an absolute URL exactly as written, without query or fragment
///
/// `Url::path()` is percent-encoded, which would not match names on disk.
fn raw_path(reference: &str) -> &str {
    let after_scheme = reference
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(reference);
    let path = after_scheme.find('/').map(|i| &after_scheme[i..]).unwrap_or("");
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn strip_leading_slash(path: &str) -> PathBuf {
    PathBuf::from(path.trim_start_matches('/'))
}

/// Resolves media references to local files under the output directory
#[derive(Clone)]
pub struct AssetResolver {
    http_client: reqwest::Client,
    config: AssetConfig,
}

impl AssetResolver {
    pub fn new(config: AssetConfig) -> Result<Self, AssetError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| AssetError::Upstream(format!("HTTP client init failed: {}", e)))?;

        Ok(Self { http_client, config })
    }

    pub fn classify(&self, reference: &str) -> AssetLocation {
        classify(reference, &self.config.loopback_hosts)
    }

    /// Produce a local copy of `reference` and return its path
    pub async fn resolve_to_local(&self, reference: &str) -> Result<PathBuf, AssetError> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let dest = self
            .config
            .output_dir
            .join(format!("{}.jpg", relluna_common::uuid_utils::hex_token()));

        match self.classify(reference) {
            AssetLocation::Local(relative) => {
                if relative.components().any(|c| matches!(c, Component::ParentDir)) {
                    return Err(AssetError::NotFound(format!(
                        "{} (outside the asset root)",
                        relative.display()
                    )));
                }
                let source = self.config.local_root.join(relative);
                self.copy_local(&source, &dest).await?;
            }
            AssetLocation::Remote(url) => {
                self.fetch_remote(&url, &dest).await?;
            }
        }

        Ok(dest)
    }

    async fn copy_local(&self, source: &Path, dest: &Path) -> Result<(), AssetError> {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(AssetError::NotFound(source.display().to_string()));
        }

        let bytes = tokio::fs::copy(source, dest).await?;
        tracing::debug!(
            source = %source.display(),
            dest = %dest.display(),
            bytes,
            "Copied local asset"
        );
        Ok(())
    }

    async fn fetch_remote(&self, url: &str, dest: &Path) -> Result<(), AssetError> {
        let started = Instant::now();
        tracing::debug!(url, timeout_secs = self.config.fetch_timeout.as_secs(), "Fetching remote asset");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Upstream(format!("{} returned HTTP {}", url, status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        tokio::fs::write(dest, &body).await?;

        tracing::info!(
            url,
            dest = %dest.display(),
            bytes = body.len(),
            elapsed_ms = elapsed_ms(started),
            "Remote asset downloaded"
        );
        Ok(())
    }

    fn map_transport_error(&self, url: &str, err: reqwest::Error) -> AssetError {
        if err.is_timeout() {
            tracing::warn!(url, "Remote asset fetch timed out");
            AssetError::Timeout(url.to_string())
        } else {
            AssetError::Upstream(format!("{}: {}", url, err))
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
