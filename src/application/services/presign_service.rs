use async_trait::async_trait;

use crate::{
    application::error::ApplicationError,
    domain::models::upload_target::{PresignRequest, UploadTarget},
};

#[async_trait]
pub trait PresignService: Send + Sync {
    async fn presign(&self, request: PresignRequest) -> Result<UploadTarget, ApplicationError>;
}
