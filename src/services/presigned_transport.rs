use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::{header, multipart, Client, Response};
use tracing::{debug, error, info};

use crate::{
    application::services::UploadTransport, domain::config::settings::TransportSettings,
    domain::models::file::FileData, services::error::TransportError,
};

/// Form fields starting with this prefix make the storage policy reject the
/// whole request.
pub const METADATA_FIELD_PREFIX: &str = "x-amz-meta-";

/// Drops metadata fields from a server-supplied field set. Returns the kept
/// fields and how many were dropped.
pub fn filter_upload_fields(fields: &BTreeMap<String, String>) -> (Vec<(String, String)>, usize) {
    let mut dropped = 0;
    let kept = fields
        .iter()
        .filter(|(name, _)| {
            let is_metadata = name.to_ascii_lowercase().starts_with(METADATA_FIELD_PREFIX);
            if is_metadata {
                dropped += 1;
            }
            !is_metadata
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    (kept, dropped)
}

pub struct HttpUploadTransport {
    client: Client,
    direct_put_timeout: Duration,
    form_post_timeout: Duration,
}

impl HttpUploadTransport {
    pub fn new(settings: &TransportSettings) -> Self {
        Self {
            client: Client::new(),
            direct_put_timeout: settings.direct_put_timeout,
            form_post_timeout: settings.form_post_timeout,
        }
    }

    async fn check_response(response: Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("Upload rejected with status {}: {}", status, body);
        Err(TransportError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn put_direct(&self, url: &str, file: &FileData) -> Result<(), TransportError> {
        info!(
            "Uploading {} ({} bytes) to presigned URL",
            file.filename,
            file.size()
        );

        let response = self
            .client
            .put(url)
            .timeout(self.direct_put_timeout)
            .header(header::CONTENT_TYPE, &file.mime_type)
            .header(header::CONTENT_LENGTH, file.size())
            .body(file.content.clone())
            .send()
            .await
            .map_err(|e| {
                error!("Direct upload of {} failed: {}", file.filename, e);
                TransportError::from(e)
            })?;

        Self::check_response(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &BTreeMap<String, String>,
        file: &FileData,
    ) -> Result<(), TransportError> {
        let (kept, dropped) = filter_upload_fields(fields);
        if dropped > 0 {
            debug!(
                "Dropped {} metadata fields from form upload of {}",
                dropped, file.filename
            );
        }
        info!(
            "Uploading {} ({} bytes) via form POST with {} fields",
            file.filename,
            file.size(),
            kept.len()
        );

        let mut form = multipart::Form::new();
        for (name, value) in kept {
            form = form.text(name, value);
        }
        let file_part = multipart::Part::stream_with_length(file.content.clone(), file.size())
            .file_name(file.filename.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        form = form.part("file", file_part);

        let response = self
            .client
            .post(url)
            .timeout(self.form_post_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Form upload of {} failed: {}", file.filename, e);
                TransportError::from(e)
            })?;

        Self::check_response(response).await
    }
}
