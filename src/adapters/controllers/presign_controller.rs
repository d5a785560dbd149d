use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::{
    adapters::dto::presign_dto::{PresignUrlRequest, PresignUrlResponse},
    application::{error::ApplicationError, services::PresignService},
    domain::models::upload_target::PresignRequest,
};

pub struct PresignController;

impl PresignController {
    /// Issues a presigned GET or PUT URL for an object key
    /// POST /api/v1/presigned-url
    pub async fn create_presigned_url(
        State(presign_service): State<Option<Arc<dyn PresignService>>>,
        Json(body): Json<PresignUrlRequest>,
    ) -> Result<Json<PresignUrlResponse>, ApplicationError> {
        let presign_service = presign_service.ok_or_else(|| {
            ApplicationError::Configuration("Object storage is not configured".to_string())
        })?;

        info!("Presign requested: {:?} {}", body.method, body.key);

        let target = presign_service
            .presign(PresignRequest {
                method: body.method,
                key: body.key,
                expires_in_secs: body.expires_in,
            })
            .await?;

        Ok(Json(PresignUrlResponse {
            url: target.url().to_string(),
            method: body.method,
        }))
    }
}
