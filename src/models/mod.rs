use chrono::{DateTime, Utc};
use serde::Serialize;

/// An object as reported by the store's listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            e_tag: None,
        }
    }
}

/// What the store hands back after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutReceipt {
    pub key: String,
    pub location: String,
    pub e_tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Transcode,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Transcode => write!(f, "transcode"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

/// Outcome of one item within a stage.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemReport<T> {
    Succeeded { key: String, detail: T },
    Failed { key: String, reason: String },
}

impl<T> ItemReport<T> {
    pub fn key(&self) -> &str {
        match self {
            ItemReport::Succeeded { key, .. } | ItemReport::Failed { key, .. } => key,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemReport::Failed { .. })
    }
}

/// Per-item detail kinds that can count as "skipped" in a stage summary.
pub trait Skippable {
    fn is_skipped(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Downloaded { bytes: u64 },
    AlreadyPresent,
}

impl Skippable for FetchStatus {
    fn is_skipped(&self) -> bool {
        matches!(self, FetchStatus::AlreadyPresent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeStatus {
    pub source_format: String,
    pub output_format: String,
    pub source_width: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

impl Skippable for TranscodeStatus {
    fn is_skipped(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    Uploaded(PutReceipt),
    MissingDerived,
}

impl Skippable for PublishStatus {
    fn is_skipped(&self) -> bool {
        matches!(self, PublishStatus::MissingDerived)
    }
}

/// Item-level failure recorded in a stage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
}

impl StageReport {
    pub fn from_items<T: Skippable>(items: &[ItemReport<T>]) -> Self {
        let mut report = StageReport::default();
        for item in items {
            match item {
                ItemReport::Succeeded { detail, .. } if detail.is_skipped() => report.skipped += 1,
                ItemReport::Succeeded { .. } => report.succeeded += 1,
                ItemReport::Failed { key, reason } => {
                    report.failed += 1;
                    report.failures.push(Failure {
                        key: key.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
        report.failures.sort_by(|a, b| a.key.cmp(&b.key));
        report
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub files_found: usize,
    pub images_found: usize,
    pub existing_mobile: usize,
    pub targets: Vec<String>,
    pub fetch: Option<StageReport>,
    pub transcode: Option<StageReport>,
    pub publish: Option<StageReport>,
}

impl PipelineReport {
    pub fn optimized(&self) -> usize {
        self.transcode.as_ref().map_or(0, |s| s.succeeded)
    }

    pub fn uploaded(&self) -> usize {
        self.publish.as_ref().map_or(0, |s| s.succeeded)
    }

    pub fn has_failures(&self) -> bool {
        [&self.fetch, &self.transcode, &self.publish]
            .into_iter()
            .flatten()
            .any(|s| s.failed > 0)
    }
}
