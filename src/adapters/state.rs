use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    application::{
        repositories::job_repository::JobRepository,
        services::{
            batch_pipeliner::BatchPipeliner, job_cache::JobCache,
            single_file_upload::SingleFileUploader, status_sync::StatusSynchronizer,
            upload_session::UploadSessions, PayloadEncoder, PresignService, UploadTransport,
        },
    },
    domain::config::{secrets::Secrets, settings::Settings},
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub secrets: Arc<Secrets>,
    pub job_repository: Arc<dyn JobRepository>,
    pub job_cache: JobCache,
    pub sessions: UploadSessions,
    pub single_file_uploader: SingleFileUploader,
    pub presign_service: Option<Arc<dyn PresignService>>,
    pub transport: Arc<dyn UploadTransport>,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        job_repository: Arc<dyn JobRepository>,
        encoder: Arc<dyn PayloadEncoder>,
        transport: Arc<dyn UploadTransport>,
        presign_service: Option<Arc<dyn PresignService>>,
    ) -> Self {
        let job_cache = JobCache::new();
        let synchronizer = StatusSynchronizer::new(job_repository.clone(), job_cache.clone());

        let pipeliner = BatchPipeliner::new(
            encoder,
            job_repository.clone(),
            synchronizer.clone(),
            settings.pipeline.clone(),
        );
        let sessions =
            UploadSessions::new(pipeliner, settings.completion.clone(), job_cache.clone());
        let single_file_uploader =
            SingleFileUploader::new(presign_service.clone(), transport.clone(), synchronizer);

        Self {
            secrets: Arc::new(settings.secrets.clone()),
            job_repository,
            job_cache,
            sessions,
            single_file_uploader,
            presign_service,
            transport,
        }
    }
}
