use crate::error::ItemError;
use crate::infrastructure::workspace::Workspace;
use crate::models::PublishStatus;
use crate::services::storage::{PutOptions, StorageService};
use crate::services::transcoder::OutputFormat;
use crate::utils::keys;
use std::sync::Arc;
use tracing::{info, warn};

/// Uploads transcoded outputs under their mobile keys.
pub struct Publisher {
    storage: Arc<dyn StorageService>,
    workspace: Workspace,
    content_encoding: String,
}

impl Publisher {
    pub fn new(
        storage: Arc<dyn StorageService>,
        workspace: Workspace,
        content_encoding: String,
    ) -> Self {
        Self {
            storage,
            workspace,
            content_encoding,
        }
    }

    /// A missing output is a skip, not a failure: the transcode step already
    /// reported why it is absent.
    pub async fn publish(&self, key: &str) -> Result<PublishStatus, ItemError> {
        let mobile_key = keys::mobile_key(key)?;
        let path = self.workspace.out_path(key)?;

        if !tokio::fs::try_exists(&path).await? {
            warn!(key = %key, "Warning: Missing optimized image {}", path.display());
            return Ok(PublishStatus::MissingDerived);
        }

        let data = tokio::fs::read(&path).await?;
        // Sniff the written bytes; a PNG may sit under a .jpg name.
        let content_type = match image::guess_format(&data) {
            Ok(image::ImageFormat::Jpeg) => Some(OutputFormat::Jpeg),
            Ok(image::ImageFormat::Png) => Some(OutputFormat::Png),
            _ => OutputFormat::from_key(key),
        }
        .map(|f| f.mime_type().to_string());

        info!(key = %key, "Uploading {}", mobile_key);
        let receipt = self
            .storage
            .put_object(
                &mobile_key,
                data,
                PutOptions {
                    content_encoding: Some(self.content_encoding.clone()),
                    content_type,
                },
            )
            .await?;

        Ok(PublishStatus::Uploaded(receipt))
    }
}
