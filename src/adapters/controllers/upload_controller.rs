use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::{
    adapters::dto::upload_dto::{UploadErrorResponse, UploadForwardResponse},
    application::services::UploadTransport,
    domain::models::{file::FileData, upload_target::UploadTarget},
    services::TransportError,
};

pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

const PRESIGNED_URL_HEADER: &str = "x-presigned-url";
const UPLOAD_URL_HEADER: &str = "x-upload-url";
const UPLOAD_FIELDS_HEADER: &str = "x-upload-fields";
const UPLOAD_METHOD_HEADER: &str = "x-upload-method";
const FILE_NAME_HEADER: &str = "x-file-name";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Reads the upload instructions carried by the request headers.
pub fn upload_target_from_headers(headers: &HeaderMap) -> Result<UploadTarget, TransportError> {
    if let Some(url) = header_str(headers, PRESIGNED_URL_HEADER) {
        return Ok(UploadTarget::Direct {
            url: url.to_string(),
        });
    }

    let url = header_str(headers, UPLOAD_URL_HEADER).ok_or_else(|| {
        TransportError::InvalidRequest(format!(
            "Missing {} or {} header",
            PRESIGNED_URL_HEADER, UPLOAD_URL_HEADER
        ))
    })?;

    let fields = match header_str(headers, UPLOAD_FIELDS_HEADER) {
        Some(raw) => serde_json::from_str::<BTreeMap<String, String>>(raw).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid {} header: {}", UPLOAD_FIELDS_HEADER, e))
        })?,
        None => BTreeMap::new(),
    };

    let method = header_str(headers, UPLOAD_METHOD_HEADER)
        .unwrap_or("POST")
        .to_ascii_uppercase();

    Ok(UploadTarget::Form {
        url: url.to_string(),
        fields,
        method,
    })
}

fn file_name_for(headers: &HeaderMap, target: &UploadTarget) -> String {
    if let Some(name) = header_str(headers, FILE_NAME_HEADER) {
        return name.to_string();
    }
    let from_key = match target {
        UploadTarget::Form { fields, .. } => fields
            .get("key")
            .and_then(|key| key.rsplit('/').next())
            .map(str::to_string),
        UploadTarget::Direct { .. } => None,
    };
    from_key
        .filter(|name| !name.is_empty() && !name.contains("${filename}"))
        .unwrap_or_else(|| "upload".to_string())
}

fn failure(status: StatusCode, details: String) -> Response {
    (
        status,
        Json(UploadErrorResponse {
            error: "Upload failed".to_string(),
            details,
        }),
    )
        .into_response()
}

pub struct UploadController;

impl UploadController {
    /// Forwards raw bytes to object storage.
    /// PUT /api/v1/upload
    pub async fn forward_upload(
        State(transport): State<Arc<dyn UploadTransport>>,
        headers: HeaderMap,
        body: Body,
    ) -> Response {
        let target = match upload_target_from_headers(&headers) {
            Ok(target) => target,
            Err(e) => {
                warn!("Rejected upload request: {}", e);
                return failure(StatusCode::BAD_REQUEST, e.to_string());
            }
        };

        let content = match to_bytes(body, MAX_UPLOAD_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read upload body: {}", e);
                return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        };

        let mime_type = header_str(&headers, header::CONTENT_TYPE.as_str())
            .unwrap_or("application/octet-stream")
            .to_string();
        if let Some(declared) = header_str(&headers, header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if declared != content.len() {
                warn!(
                    "Declared Content-Length {} differs from received {} bytes",
                    declared,
                    content.len()
                );
            }
        }

        let file = FileData::new(content, file_name_for(&headers, &target), mime_type);
        info!(
            "Forwarding {} bytes of {} ({})",
            file.size(),
            file.filename,
            match &target {
                UploadTarget::Direct { .. } => "direct PUT",
                UploadTarget::Form { .. } => "form POST",
            }
        );

        match transport.deliver(&target, &file).await {
            Ok(()) => (
                StatusCode::OK,
                Json(UploadForwardResponse { success: true }),
            )
                .into_response(),
            Err(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let details = match e {
                    TransportError::Http { body, .. } => body,
                    other => other.to_string(),
                };
                failure(status, details)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn presigned_url_header_selects_direct_put() {
        let mut headers = HeaderMap::new();
        headers.insert(
            PRESIGNED_URL_HEADER,
            HeaderValue::from_static("https://bucket.s3.amazonaws.com/a.psd?sig=1"),
        );

        let target = upload_target_from_headers(&headers).unwrap();
        assert_eq!(
            target,
            UploadTarget::Direct {
                url: "https://bucket.s3.amazonaws.com/a.psd?sig=1".to_string()
            }
        );
    }

    #[test]
    fn upload_headers_select_form_post() {
        let mut headers = HeaderMap::new();
        headers.insert(UPLOAD_URL_HEADER, HeaderValue::from_static("https://bucket.local/"));
        headers.insert(
            UPLOAD_FIELDS_HEADER,
            HeaderValue::from_static(r#"{"key":"jobs/1/a.psd","policy":"p"}"#),
        );

        let target = upload_target_from_headers(&headers).unwrap();
        match &target {
            UploadTarget::Form { fields, method, .. } => {
                assert_eq!(method, "POST");
                assert_eq!(fields.get("policy").map(String::as_str), Some("p"));
            }
            other => panic!("expected form target, got {:?}", other),
        }
        assert_eq!(file_name_for(&headers, &target), "a.psd");
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(UPLOAD_URL_HEADER, HeaderValue::from_static("https://bucket.local/"));
        headers.insert(UPLOAD_FIELDS_HEADER, HeaderValue::from_static("not json"));

        assert!(matches!(
            upload_target_from_headers(&headers),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn missing_instructions_are_rejected() {
        assert!(upload_target_from_headers(&HeaderMap::new()).is_err());
    }
}
