use crate::error::ItemError;
use crate::utils::keys;
use std::path::{Path, PathBuf};
use tracing::info;

/// The two local working areas: downloaded originals and transcoded outputs.
#[derive(Debug, Clone)]
pub struct Workspace {
    raw_root: PathBuf,
    out_root: PathBuf,
}

impl Workspace {
    pub fn new(raw_root: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> Self {
        Self {
            raw_root: raw_root.into(),
            out_root: out_root.into(),
        }
    }

    /// Creates both roots if they do not exist yet.
    pub async fn provision(&self) -> std::io::Result<()> {
        for root in [&self.raw_root, &self.out_root] {
            tokio::fs::create_dir_all(root).await?;
        }
        info!(
            "📁 Workspace ready (raw: {}, out: {})",
            self.raw_root.display(),
            self.out_root.display()
        );
        Ok(())
    }

    pub fn raw_root(&self) -> &Path {
        &self.raw_root
    }

    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    pub fn raw_path(&self, key: &str) -> Result<PathBuf, ItemError> {
        keys::local_path(&self.raw_root, key)
    }

    pub fn out_path(&self, key: &str) -> Result<PathBuf, ItemError> {
        keys::local_path(&self.out_root, key)
    }
}

/// Creates the parent directory of `path`.
pub async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
