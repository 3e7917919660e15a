use crate::error::PipelineError;
use crate::models::ObjectRecord;
use crate::services::storage::StorageService;
use crate::utils::keys;
use std::collections::HashSet;
use tracing::info;

/// Lists the full catalog under `prefix`. Any store error is fatal for the run.
pub async fn list_catalog(
    storage: &dyn StorageService,
    prefix: &str,
) -> Result<Vec<ObjectRecord>, PipelineError> {
    let catalog = storage
        .list_objects(prefix)
        .await
        .map_err(PipelineError::Catalog)?;
    info!("{} files found", catalog.len());
    Ok(catalog)
}

/// Result of narrowing a catalog down to images without a mobile variant.
#[derive(Debug, Clone, Default)]
pub struct TargetSelection {
    pub images_found: usize,
    pub existing_mobile: usize,
    pub targets: Vec<ObjectRecord>,
}

impl TargetSelection {
    pub fn keys(&self) -> Vec<String> {
        self.targets.iter().map(|r| r.key.clone()).collect()
    }
}

/// Picks the originals that still need a mobile variant, in catalog order.
pub fn select_targets(catalog: &[ObjectRecord]) -> TargetSelection {
    let images: Vec<&ObjectRecord> = catalog
        .iter()
        .filter(|r| keys::has_image_extension(&r.key))
        .collect();

    let covered: HashSet<String> = images
        .iter()
        .filter_map(|r| keys::original_key(&r.key))
        .collect();
    let existing_mobile = images.iter().filter(|r| keys::is_mobile_key(&r.key)).count();

    let targets = images
        .iter()
        .filter(|r| !keys::is_mobile_key(&r.key) && !covered.contains(&r.key))
        .map(|r| (*r).clone())
        .collect();

    TargetSelection {
        images_found: images.len(),
        existing_mobile,
        targets,
    }
}
