use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    Client,
};
use tracing::{error, info};

use crate::{
    application::{error::ApplicationError, services::PresignService},
    domain::{
        config::secrets::S3Secrets,
        models::upload_target::{PresignMethod, PresignRequest, UploadTarget},
    },
};

/// Longest expiry S3 accepts for a SigV4 presigned URL.
const MAX_EXPIRY_SECS: u64 = 604_800;

pub struct S3PresignService {
    client: Client,
    bucket_name: String,
}

impl S3PresignService {
    pub fn new(secrets: S3Secrets) -> Self {
        let credentials = Credentials::new(
            secrets.access_key_id,
            secrets.secret_access_key,
            None,
            None,
            "psd-upload-service",
        );

        let mut config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version_latest()
            .region(Region::new(secrets.region))
            .credentials_provider(credentials);

        // Custom endpoints (MinIO, R2, Supabase) need path-style addressing.
        if let Some(endpoint) = secrets
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            config_builder = config_builder
                .endpoint_url(endpoint.to_string())
                .force_path_style(true);
        }

        Self {
            client: Client::from_conf(config_builder.build()),
            bucket_name: secrets.bucket_name,
        }
    }
}

#[async_trait]
impl PresignService for S3PresignService {
    async fn presign(&self, request: PresignRequest) -> Result<UploadTarget, ApplicationError> {
        let key = request.key.trim_start_matches('/');
        if key.is_empty() {
            return Err(ApplicationError::BadRequest(
                "Object key must not be empty".to_string(),
            ));
        }

        let ttl = request.expires_in_secs.clamp(1, MAX_EXPIRY_SECS);
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl))
            .map_err(|e| ApplicationError::BadRequest(format!("Invalid presign ttl: {}", e)))?;

        let presigned = match request.method {
            PresignMethod::Get => self
                .client
                .get_object()
                .bucket(&self.bucket_name)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| e.to_string()),
            PresignMethod::Put => self
                .client
                .put_object()
                .bucket(&self.bucket_name)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| e.to_string()),
        }
        .map_err(|e| {
            error!("Failed to presign {:?} for {}: {}", request.method, key, e);
            ApplicationError::InternalError(format!("Presign failed: {}", e))
        })?;

        info!("Issued presigned {:?} URL for {} ({}s)", request.method, key, ttl);

        Ok(UploadTarget::Direct {
            url: presigned.uri().to_string(),
        })
    }
}
