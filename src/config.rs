//! Client configuration
//!
//! Everything the client needs at construction: credentials, the target
//! bucket, an optional custom endpoint (for S3-compatible stores such as
//! MinIO), and the concurrency limits applied to each operation pool.
//! Loadable from a JSON file for tooling that keeps its connection settings
//! on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pool::ConcurrencyLimits;

/// Construction-time settings for an [`S3Client`](crate::S3Client).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Access key id.
    pub key: String,
    /// Secret access key.
    pub secret: String,
    /// Target bucket.
    pub bucket: String,

    /// Custom service endpoint, e.g. `http://localhost:9000`. Defaults to
    /// the AWS S3 endpoint with virtual-hosted addressing.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Signing region. Defaults to `us-east-1`.
    #[serde(default)]
    pub region: Option<String>,

    /// Address the bucket as a path segment instead of a subdomain.
    /// Required by most local S3-compatible stores.
    #[serde(default)]
    pub force_path_style: bool,

    /// Generic concurrency limit for every operation kind without its own
    /// override. Hard default is 10.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,
    #[serde(default)]
    pub max_concurrent_uploads: Option<usize>,
    #[serde(default)]
    pub max_concurrent_lists: Option<usize>,
    #[serde(default)]
    pub max_concurrent_deletes: Option<usize>,
}

impl ClientConfig {
    pub fn new(
        key: impl Into<String>,
        secret: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read client config from {:?}", path))?;

        let config: ClientConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse client config from {:?}", path))?;

        tracing::debug!(
            bucket = %config.bucket,
            endpoint = config.endpoint.as_deref(),
            "loaded client config"
        );

        Ok(config)
    }

    pub(crate) fn concurrency_limits(&self) -> ConcurrencyLimits {
        ConcurrencyLimits {
            generic: self.max_concurrent,
            downloads: self.max_concurrent_downloads,
            uploads: self.max_concurrent_uploads,
            lists: self.max_concurrent_lists,
            deletes: self.max_concurrent_deletes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"key": "AKID", "secret": "s3cr3t", "bucket": "my-bucket"}"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.key, "AKID");
        assert_eq!(config.bucket, "my-bucket");
        assert!(config.endpoint.is_none());
        assert!(!config.force_path_style);
        assert!(config.max_concurrent.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "key": "AKID",
                "secret": "s3cr3t",
                "bucket": "my-bucket",
                "endpoint": "http://localhost:9000",
                "force_path_style": true,
                "max_concurrent": 20,
                "max_concurrent_uploads": 4
            }"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.force_path_style);

        let limits = config.concurrency_limits();
        assert_eq!(limits.generic, Some(20));
        assert_eq!(limits.uploads, Some(4));
        assert_eq!(limits.deletes, None);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(ClientConfig::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = ClientConfig::new("AKID", "s3cr3t", "my-bucket");
        config.max_concurrent_deletes = Some(3);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_concurrent_deletes, Some(3));
        assert_eq!(parsed.bucket, "my-bucket");
    }
}
