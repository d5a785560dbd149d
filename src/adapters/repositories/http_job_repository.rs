use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    application::{
        dto::{
            bulk_upload_dto::BulkUploadRequest,
            status_dto::{
                FileStatusUpdate, GroupFilesResponse, GroupStatusUpdateRequest,
                SingleStatusUpdateRequest,
            },
        },
        error::ApplicationError,
        repositories::job_repository::JobRepository,
    },
    domain::models::job::{FileStatus, OriginalFile, UploadJob},
};

/// Job/file records served by the Content Pipeline REST API.
pub struct HttpJobRepository {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpJobRepository {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Request to `base_url` extended by `segments`, each percent-encoded as a
    /// single path segment. Dot segments are refused since `Url` would drop them.
    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, ApplicationError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            warn!("Refusing Content Pipeline path segment {:?}", bad);
            return Err(ApplicationError::BadRequest(format!(
                "Invalid identifier {:?}",
                bad
            )));
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApplicationError::Configuration(format!(
                "Invalid Content Pipeline URL {}: {}",
                self.base_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ApplicationError::Configuration(format!(
                    "Content Pipeline URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        let builder = self.client.request(method, url);
        Ok(match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        })
    }

    async fn check(response: Response) -> Result<Response, ApplicationError> {
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ApplicationError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Content Pipeline answered {}: {}", status, body);
            return Err(ApplicationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApplicationError> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| {
                ApplicationError::InternalError(format!("Invalid Content Pipeline response: {}", e))
            })
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn get_job(&self, job_id: &str) -> Result<UploadJob, ApplicationError> {
        let response = self
            .request(Method::GET, &["jobs", job_id])?
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn update_files_status(
        &self,
        job_id: &str,
        group_filename: &str,
        updates: &[FileStatusUpdate],
    ) -> Result<Vec<OriginalFile>, ApplicationError> {
        let body = GroupStatusUpdateRequest {
            group_filename: group_filename.to_string(),
            updates: updates.to_vec(),
        };

        let response = self
            .request(Method::POST, &["jobs", job_id, "files", "status"])?
            .json(&body)
            .send()
            .await?;
        let echoed: GroupFilesResponse = Self::parse(response).await?;
        Ok(echoed.files)
    }

    async fn update_file_status(
        &self,
        job_id: &str,
        group_filename: &str,
        filename: &str,
        status: FileStatus,
    ) -> Result<Vec<OriginalFile>, ApplicationError> {
        let body = SingleStatusUpdateRequest {
            group_filename: group_filename.to_string(),
            filename: filename.to_string(),
            status,
        };

        let response = self
            .request(Method::PUT, &["jobs", job_id, "files", "status"])?
            .json(&body)
            .send()
            .await?;
        let echoed: GroupFilesResponse = Self::parse(response).await?;
        Ok(echoed.files)
    }

    async fn bulk_upload(&self, request: BulkUploadRequest) -> Result<(), ApplicationError> {
        let names: Vec<&str> = request.files.iter().map(|f| f.filename.as_str()).collect();
        info!(
            "Bulk uploading {:?} for job {} into '{}'",
            names, request.job_id, request.folder
        );

        let response = self
            .request(Method::POST, &["files", "bulk-upload"])?
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
