use std::sync::Arc;

use async_trait::async_trait;

use crate::{domain::models::file::FileData, services::ConversionError};

/// Turns raw file bytes into the base64 payload expected by bulk uploads.
#[async_trait]
pub trait PayloadEncoder: Send + Sync {
    async fn encode(&self, file: Arc<FileData>) -> Result<String, ConversionError>;
}
