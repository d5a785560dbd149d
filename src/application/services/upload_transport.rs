use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    domain::models::{file::FileData, upload_target::UploadTarget},
    services::TransportError,
};

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Sends the raw bytes to a single presigned URL.
    async fn put_direct(&self, url: &str, file: &FileData) -> Result<(), TransportError>;

    /// Sends a multipart form built from `fields` with the file appended last.
    async fn post_form(
        &self,
        url: &str,
        fields: &BTreeMap<String, String>,
        file: &FileData,
    ) -> Result<(), TransportError>;

    async fn deliver(&self, target: &UploadTarget, file: &FileData) -> Result<(), TransportError> {
        match target {
            UploadTarget::Direct { url } => self.put_direct(url, file).await,
            UploadTarget::Form { url, fields, .. } => self.post_form(url, fields, file).await,
        }
    }
}
