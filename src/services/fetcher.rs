use crate::error::ItemError;
use crate::infrastructure::workspace::{Workspace, ensure_parent};
use crate::models::FetchStatus;
use crate::services::storage::StorageService;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Downloads originals into the raw cache.
pub struct Fetcher {
    storage: Arc<dyn StorageService>,
    workspace: Workspace,
}

impl Fetcher {
    pub fn new(storage: Arc<dyn StorageService>, workspace: Workspace) -> Self {
        Self { storage, workspace }
    }

    /// Streams `key` to its raw path unless a file is already there.
    ///
    /// Presence is the only check: size and content of an existing file are
    /// not compared with the store.
    pub async fn fetch(&self, key: &str) -> Result<FetchStatus, ItemError> {
        let path = self.workspace.raw_path(key)?;
        if tokio::fs::try_exists(&path).await? {
            info!(key = %key, "Skipping {}", key);
            return Ok(FetchStatus::AlreadyPresent);
        }

        info!(key = %key, "Downloading {}", key);
        ensure_parent(&path).await?;
        let bytes = self.download(key, &path).await?;
        Ok(FetchStatus::Downloaded { bytes })
    }

    /// Streams into a temp file beside `path` and renames it into place once
    /// complete. The temp file is deleted when dropped, so a failed or
    /// cancelled download never leaves a truncated original at `path`.
    async fn download(&self, key: &str, path: &Path) -> Result<u64, ItemError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dir)?
            .into_parts();

        let mut reader = self.storage.get_object_stream(key).await?;
        let mut file = tokio::fs::File::from_std(file);
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        drop(file);

        temp_path.persist(path).map_err(|e| ItemError::Io(e.error))?;
        Ok(bytes)
    }
}
