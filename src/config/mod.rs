use crate::error::PipelineError;
use std::env;
use std::path::PathBuf;

/// Connection settings for the object store
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Bucket holding the originals and their mobile variants (required)
    pub bucket: String,

    /// Key prefix to list under (default: "")
    pub prefix: String,

    /// Region; falls back to the AWS provider chain when unset
    pub region: Option<String>,

    /// Custom S3-compatible endpoint, addressed path-style
    pub endpoint: Option<String>,

    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bucket = non_empty("S3_UPLOADS_BUCKET")
            .ok_or_else(|| PipelineError::Config("S3_UPLOADS_BUCKET must be set".to_string()))?;

        Ok(Self {
            bucket,
            prefix: lookup("S3_PREFIX").unwrap_or_default(),
            region: non_empty("S3_REGION"),
            endpoint: non_empty("S3_ENDPOINT"),
            access_key_id: non_empty("S3_ACCESS_KEY_ID"),
            secret_access_key: non_empty("S3_SECRET_ACCESS_KEY"),
        })
    }

    /// Static credentials, when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// How fetch and publish failures affect the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    Isolate,
    /// Stop the stage at the first failure and fail the run.
    Abort,
}

/// Resize and encoder settings for mobile variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSettings {
    /// Images wider than this are scaled down to it (default: 800)
    pub max_width: u32,

    /// JPEG quality, 1-100 (default: 70)
    pub jpeg_quality: u8,

    /// PNG compression level, 0-9 (default: 7)
    pub png_compression: u8,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            max_width: 800,
            jpeg_quality: 70,
            png_compression: 7,
        }
    }
}

/// Local working areas and batch behaviour
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cache of downloaded originals (default: "./raw")
    pub raw_dir: PathBuf,

    /// Transcoded outputs awaiting upload (default: "./out")
    pub out_dir: PathBuf,

    /// Items in flight per stage (default: 16)
    pub concurrency: usize,

    pub failure_policy: FailurePolicy,

    /// Content-Encoding sent with every upload (default: "base64")
    pub content_encoding: String,

    pub transcode: TranscodeSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./raw"),
            out_dir: PathBuf::from("./out"),
            concurrency: 16,
            failure_policy: FailurePolicy::Isolate,
            content_encoding: "base64".to_string(),
            transcode: TranscodeSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let defaults = default.transcode;

        Self {
            raw_dir: lookup("RAW_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.raw_dir),

            out_dir: lookup("OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.out_dir),

            concurrency: lookup("CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.concurrency)
                .max(1),

            failure_policy: lookup("FAIL_FAST")
                .map(|v| {
                    if v.to_lowercase() == "true" || v == "1" {
                        FailurePolicy::Abort
                    } else {
                        FailurePolicy::Isolate
                    }
                })
                .unwrap_or(default.failure_policy),

            content_encoding: lookup("CONTENT_ENCODING").unwrap_or(default.content_encoding),

            transcode: TranscodeSettings {
                max_width: lookup("MAX_WIDTH")
                    .and_then(|v| v.parse().ok())
                    .filter(|w| *w > 0)
                    .unwrap_or(defaults.max_width),

                jpeg_quality: lookup("JPEG_QUALITY")
                    .and_then(|v| v.parse().ok())
                    .map(|q: u8| q.clamp(1, 100))
                    .unwrap_or(defaults.jpeg_quality),

                png_compression: lookup("PNG_COMPRESSION")
                    .and_then(|v| v.parse().ok())
                    .map(|c: u8| c.min(9))
                    .unwrap_or(defaults.png_compression),
            },
        }
    }
}
