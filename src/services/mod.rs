mod base64_worker;
mod error;
mod presigned_transport;
mod s3_presigner;

pub use base64_worker::{encode_base64, ConversionWorker};
pub use error::{ConversionError, TransportError};
pub use presigned_transport::{filter_upload_fields, HttpUploadTransport, METADATA_FIELD_PREFIX};
pub use s3_presigner::S3PresignService;

use std::sync::Arc;

use crate::{application::services::PresignService, domain::config::secrets::Secrets};

/// Presign service for the configured bucket, `None` when S3 is not configured.
pub fn create_presign_service(secrets: &Secrets) -> Option<Arc<dyn PresignService>> {
    secrets
        .s3_secrets
        .as_ref()
        .map(|s3| Arc::new(S3PresignService::new(s3.clone())) as Arc<dyn PresignService>)
}
