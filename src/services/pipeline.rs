use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::{ItemError, PipelineError};
use crate::infrastructure::workspace::Workspace;
use crate::models::{ItemReport, PipelineReport, Stage, StageReport};
use crate::services::catalog::{list_catalog, select_targets};
use crate::services::fetcher::Fetcher;
use crate::services::publisher::Publisher;
use crate::services::storage::StorageService;
use crate::services::transcoder::Transcoder;
use futures::{StreamExt, stream};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use tracing::{info, warn};

/// One run of list → select → fetch → transcode → publish.
pub struct Pipeline {
    storage: Arc<dyn StorageService>,
    prefix: String,
    config: PipelineConfig,
    workspace: Workspace,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn StorageService>,
        prefix: impl Into<String>,
        config: PipelineConfig,
    ) -> Self {
        let workspace = Workspace::new(config.raw_dir.clone(), config.out_dir.clone());
        Self {
            storage,
            prefix: prefix.into(),
            config,
            workspace,
            dry_run: false,
        }
    }

    /// Stop after target selection.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let catalog = list_catalog(self.storage.as_ref(), &self.prefix).await?;

        let selection = select_targets(&catalog);
        info!("{} images found", selection.images_found);
        info!(
            "{} images with existing mobile versions found",
            selection.existing_mobile
        );
        info!("{} images for processing found", selection.targets.len());

        let keys = selection.keys();
        let mut report = PipelineReport {
            files_found: catalog.len(),
            images_found: selection.images_found,
            existing_mobile: selection.existing_mobile,
            targets: keys.clone(),
            ..PipelineReport::default()
        };

        if keys.is_empty() {
            return Ok(report);
        }

        if self.dry_run {
            for key in &keys {
                info!(key = %key, "Would process {}", key);
            }
            return Ok(report);
        }

        self.workspace.provision().await?;
        let concurrency = self.config.concurrency.max(1);
        let policy = self.config.failure_policy;

        info!("Downloading...");
        let fetcher = Fetcher::new(self.storage.clone(), self.workspace.clone());
        let fetcher = &fetcher;
        let fetched = dispatch(Stage::Fetch, &keys, concurrency, policy, |key| async move {
            fetcher.fetch(&key).await
        })
        .await?;
        report.fetch = Some(StageReport::from_items(&fetched));
        info!("Download complete!");

        info!("Generating optimized images...");
        let transcoder = Transcoder::new(self.workspace.clone(), self.config.transcode);
        let transcoder = &transcoder;
        // A bad image never stops the batch.
        let transcoded = dispatch(
            Stage::Transcode,
            &keys,
            concurrency,
            FailurePolicy::Isolate,
            |key| async move { transcoder.transcode(&key).await },
        )
        .await?;
        let transcode_report = StageReport::from_items(&transcoded);
        info!("Successfully optimized {} images!", transcode_report.succeeded);
        report.transcode = Some(transcode_report);

        info!("Uploading optimized images...");
        let publisher = Publisher::new(
            self.storage.clone(),
            self.workspace.clone(),
            self.config.content_encoding.clone(),
        );
        let publisher = &publisher;
        let published = dispatch(Stage::Publish, &keys, concurrency, policy, |key| async move {
            publisher.publish(&key).await
        })
        .await?;
        let publish_report = StageReport::from_items(&published);
        info!("Successfully uploaded {} images!", publish_report.succeeded);
        report.publish = Some(publish_report);

        Ok(report)
    }
}

/// Runs `op` for every key with at most `concurrency` items in flight.
///
/// Under [`FailurePolicy::Abort`] the first failure drops the remaining
/// in-flight items and is returned as the stage error.
pub async fn dispatch<T, F, Fut>(
    stage: Stage,
    keys: &[String],
    concurrency: usize,
    policy: FailurePolicy,
    op: F,
) -> Result<Vec<ItemReport<T>>, PipelineError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, ItemError>>,
{
    let mut results = pin!(
        stream::iter(keys.iter().cloned())
            .map(|key| {
                let fut = op(key.clone());
                async move { (key, fut.await) }
            })
            .buffer_unordered(concurrency.max(1))
    );

    let mut reports = Vec::with_capacity(keys.len());
    while let Some((key, result)) = results.next().await {
        match result {
            Ok(detail) => reports.push(ItemReport::Succeeded { key, detail }),
            Err(source) if policy == FailurePolicy::Abort => {
                return Err(PipelineError::Stage { stage, key, source });
            }
            Err(e) => {
                warn!(key = %key, "Warning: {} failed for {}: {}", stage, key, e);
                reports.push(ItemReport::Failed {
                    key,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}.jpg", i)).collect()
    }

    #[tokio::test]
    async fn test_dispatch_respects_concurrency_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak) = (&in_flight, &peak);

        let op = |key: String| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ItemError>(key.len())
        };
        let reports = dispatch(Stage::Fetch, &keys(20), 3, FailurePolicy::Isolate, op)
            .await
            .unwrap();

        assert_eq!(reports.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failures() {
        let op = |key: String| async move {
            if key == "2.jpg" {
                Err(ItemError::Decode("bad".to_string()))
            } else {
                Ok(())
            }
        };
        let reports = dispatch(Stage::Publish, &keys(4), 2, FailurePolicy::Isolate, op)
            .await
            .unwrap();

        assert_eq!(reports.len(), 4);
        let failed: Vec<_> = reports.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key(), "2.jpg");
    }

    #[tokio::test]
    async fn test_dispatch_aborts_on_first_failure() {
        let err = dispatch(Stage::Fetch, &keys(4), 1, FailurePolicy::Abort, |key| async move {
            if key == "1.jpg" {
                Err(ItemError::UnsafeKey(key))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap_err();

        match err {
            PipelineError::Stage { stage, key, .. } => {
                assert_eq!(stage, Stage::Fetch);
                assert_eq!(key, "1.jpg");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
