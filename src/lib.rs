pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::{FailurePolicy, PipelineConfig, StoreConfig, TranscodeSettings};
pub use crate::error::{ItemError, PipelineError};
pub use crate::models::PipelineReport;
pub use crate::services::pipeline::Pipeline;
pub use crate::services::storage::StorageService;
