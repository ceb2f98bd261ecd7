//! Runtime configuration.
//!
//! Everything has a working default; a TOML file can override any field and
//! `CVOCR_BUCKET` overrides the bucket from the environment. Access tokens
//! are not configuration — they arrive through CLI arguments wired to
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ocr::VISION_ENDPOINT;
use crate::repository::DOCUMENTCLOUD_API;
use crate::storage::GCS_ENDPOINT;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cvocr.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bucket holding uploaded PDFs and result shards.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Cloud Storage API endpoint.
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,

    /// Cloud Vision API endpoint.
    #[serde(default = "default_vision_endpoint")]
    pub vision_endpoint: String,

    /// DocumentCloud API base.
    #[serde(default = "default_documentcloud_api")]
    pub documentcloud_api: String,

    /// Seconds to wait for an annotation job before failing it.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Source pages grouped into each result shard.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_bucket() -> String {
    "documentcloud_cloudvision_ocr".to_string()
}

fn default_storage_endpoint() -> String {
    GCS_ENDPOINT.to_string()
}

fn default_vision_endpoint() -> String {
    VISION_ENDPOINT.to_string()
}

fn default_documentcloud_api() -> String {
    DOCUMENTCLOUD_API.to_string()
}

fn default_job_timeout_secs() -> u64 {
    360
}

fn default_batch_size() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            storage_endpoint: default_storage_endpoint(),
            vision_endpoint: default_vision_endpoint(),
            documentcloud_api: default_documentcloud_api(),
            job_timeout_secs: default_job_timeout_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; otherwise `cvocr.toml` is read when
    /// present and defaults apply when it is not. `CVOCR_BUCKET` wins over
    /// both.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    toml::from_str(&std::fs::read_to_string(default_path)?)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(bucket) = std::env::var("CVOCR_BUCKET") {
            if !bucket.is_empty() {
                config.bucket = bucket;
            }
        }

        Ok(config)
    }

    pub fn job_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bucket, "documentcloud_cloudvision_ocr");
        assert_eq!(config.storage_endpoint, "https://storage.googleapis.com");
        assert_eq!(config.vision_endpoint, "https://vision.googleapis.com");
        assert_eq!(config.job_timeout_secs, 360);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("bucket = \"my-bucket\"").unwrap();
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.bucket, config.bucket);
        assert_eq!(parsed.job_timeout_secs, config.job_timeout_secs);
    }
}
