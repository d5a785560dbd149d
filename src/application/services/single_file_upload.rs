use std::sync::Arc;

use tracing::{error, info};

use crate::{
    application::{
        error::ApplicationError,
        services::{
            status_sync::{LocalJobState, StatusSynchronizer, SyncOutcome},
            PresignService, UploadTransport,
        },
    },
    domain::models::{
        file::FileData,
        job::FileStatus,
        upload_target::{PresignMethod, PresignRequest},
    },
};

const UPLOAD_URL_EXPIRY_SECS: u64 = 3600;

/// Uploads one file straight to object storage through a presigned URL and
/// tracks its status with per-file updates.
#[derive(Clone)]
pub struct SingleFileUploader {
    presign: Option<Arc<dyn PresignService>>,
    transport: Arc<dyn UploadTransport>,
    synchronizer: StatusSynchronizer,
}

impl SingleFileUploader {
    pub fn new(
        presign: Option<Arc<dyn PresignService>>,
        transport: Arc<dyn UploadTransport>,
        synchronizer: StatusSynchronizer,
    ) -> Self {
        Self {
            presign,
            transport,
            synchronizer,
        }
    }

    pub async fn upload(
        &self,
        local: &LocalJobState,
        group_filename: &str,
        file: FileData,
    ) -> Result<SyncOutcome, ApplicationError> {
        let presign = self.presign.as_ref().ok_or_else(|| {
            ApplicationError::Configuration("Object storage is not configured".to_string())
        })?;

        let file_path = {
            let job = local.lock().unwrap();
            job.file(group_filename, &file.filename)
                .map(|f| f.file_path.clone())
                .ok_or(ApplicationError::NotFound)?
        };

        self.synchronizer
            .sync_file(local, group_filename, &file.filename, FileStatus::Uploading)
            .await;

        let delivered = match presign
            .presign(PresignRequest {
                method: PresignMethod::Put,
                key: file_path.clone(),
                expires_in_secs: UPLOAD_URL_EXPIRY_SECS,
            })
            .await
        {
            Ok(target) => self
                .transport
                .deliver(&target, &file)
                .await
                .map_err(ApplicationError::from),
            Err(e) => Err(e),
        };

        match delivered {
            Ok(()) => {
                info!("Uploaded {} to {}", file.filename, file_path);
                Ok(self
                    .synchronizer
                    .sync_file(local, group_filename, &file.filename, FileStatus::Uploaded)
                    .await)
            }
            Err(e) => {
                error!(
                    "Single-file upload of '{}' in group '{}' failed: {:?}",
                    file.filename, group_filename, e
                );
                self.synchronizer
                    .sync_file(
                        local,
                        group_filename,
                        &file.filename,
                        FileStatus::UploadFailed,
                    )
                    .await;
                Err(e)
            }
        }
    }
}
