use crate::models::Stage;
use thiserror::Error;

/// Failure of a single item inside a stage.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Unsafe key: {0}")]
    UnsafeKey(String),

    #[error("Key has no extension: {0}")]
    MissingExtension(String),

    #[error("Worker error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure that ends the whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Catalog listing failed: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("{stage} failed for {key}: {source}")]
    Stage {
        stage: Stage,
        key: String,
        #[source]
        source: ItemError,
    },
}
