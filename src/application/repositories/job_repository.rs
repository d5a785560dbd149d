use async_trait::async_trait;

use crate::{
    application::{
        dto::{bulk_upload_dto::BulkUploadRequest, status_dto::FileStatusUpdate},
        error::ApplicationError,
    },
    domain::models::job::{FileStatus, OriginalFile, UploadJob},
};

/// Remote job/file records kept by the Content Pipeline.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<UploadJob, ApplicationError>;

    /// Applies several status changes to one group in a single call.
    ///
    /// # Returns
    /// The full current file list of the group after the update.
    async fn update_files_status(
        &self,
        job_id: &str,
        group_filename: &str,
        updates: &[FileStatusUpdate],
    ) -> Result<Vec<OriginalFile>, ApplicationError>;

    /// Same as [`JobRepository::update_files_status`] for a single file.
    async fn update_file_status(
        &self,
        job_id: &str,
        group_filename: &str,
        filename: &str,
        status: FileStatus,
    ) -> Result<Vec<OriginalFile>, ApplicationError>;

    async fn bulk_upload(&self, request: BulkUploadRequest) -> Result<(), ApplicationError>;
}
