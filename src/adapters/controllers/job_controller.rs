use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};

use crate::{
    adapters::{dto::job_dto::SingleUploadResponse, state::AppState},
    application::{
        error::ApplicationError,
        repositories::job_repository::JobRepository,
        services::{job_cache::JobCache, upload_session::SessionStatus},
    },
    domain::models::{file::FileData, job::UploadJob},
};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Cached snapshot of a job, fetched from the Content Pipeline on a miss.
async fn load_job(
    cache: &JobCache,
    repository: &Arc<dyn JobRepository>,
    job_id: &str,
) -> Result<UploadJob, ApplicationError> {
    if let Some(job) = cache.get(job_id) {
        return Ok(job);
    }

    let job = repository.get_job(job_id).await?;
    cache.insert(job.clone());
    Ok(job)
}

pub struct JobController;

impl JobController {
    /// GET /api/v1/jobs/{job_id}
    pub async fn get_job(
        State(cache): State<JobCache>,
        State(repository): State<Arc<dyn JobRepository>>,
        Path(job_id): Path<String>,
    ) -> Result<Json<UploadJob>, ApplicationError> {
        let job = load_job(&cache, &repository, &job_id).await?;
        Ok(Json(job))
    }

    /// Starts a pipelined upload of the multipart `files` for a job
    /// POST /api/v1/jobs/{job_id}/uploads
    pub async fn start_upload(
        State(app_state): State<AppState>,
        Path(job_id): Path<String>,
        mut multipart: Multipart,
    ) -> Result<(StatusCode, Json<SessionStatus>), ApplicationError> {
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!("Invalid multipart data: {}", e);
            ApplicationError::BadRequest("Invalid request format".to_string())
        })? {
            let Some(filename) = field.file_name().map(str::to_string) else {
                continue;
            };
            let mime_type = field
                .content_type()
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string();
            let content = field.bytes().await.map_err(|e| {
                warn!("Cannot read bytes of {}: {}", filename, e);
                ApplicationError::BadRequest("Invalid file data".to_string())
            })?;
            files.push(FileData::new(content, filename, mime_type));
        }

        if files.is_empty() {
            return Err(ApplicationError::BadRequest(
                "No files in upload request".to_string(),
            ));
        }

        // Always start from the remote record so already uploaded files are skipped.
        let job = app_state.job_repository.get_job(&job_id).await?;
        info!("Received {} files for job {}", files.len(), job_id);

        let status = app_state.sessions.start(job, files, None)?;
        Ok((StatusCode::ACCEPTED, Json(status)))
    }

    /// GET /api/v1/jobs/{job_id}/uploads
    pub async fn upload_status(
        State(app_state): State<AppState>,
        Path(job_id): Path<String>,
    ) -> Result<Json<SessionStatus>, ApplicationError> {
        app_state
            .sessions
            .status(&job_id)
            .map(Json)
            .ok_or(ApplicationError::NotFound)
    }

    /// Uploads one file of a group straight to object storage
    /// POST /api/v1/jobs/{job_id}/files/{group}/{filename}
    pub async fn upload_single_file(
        State(app_state): State<AppState>,
        Path((job_id, group, filename)): Path<(String, String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<SingleUploadResponse>, ApplicationError> {
        if body.is_empty() {
            return Err(ApplicationError::BadRequest("Empty file body".to_string()));
        }

        let job = load_job(&app_state.job_cache, &app_state.job_repository, &job_id).await?;
        let local = Arc::new(Mutex::new(job));

        let mime_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let file = FileData::new(body, filename.clone(), mime_type);

        let outcome = app_state
            .single_file_uploader
            .upload(&local, &group, file)
            .await?;

        let file = local.lock().unwrap().file(&group, &filename).cloned();
        Ok(Json(SingleUploadResponse {
            confirmed: outcome.is_confirmed(),
            file,
        }))
    }
}
