use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    application::{
        dto::{bulk_upload_dto::BulkUploadRequest, status_dto::FileStatusUpdate},
        repositories::job_repository::JobRepository,
        services::{
            progress_tracker::ProgressTracker,
            status_sync::{LocalJobState, StatusSynchronizer},
            PayloadEncoder,
        },
    },
    domain::{
        config::settings::PipelineSettings,
        models::{
            file::{EncodedFile, FileData},
            job::{FileStatus, UploadJob},
        },
    },
    services::ConversionError,
};

/// Files of one group that are present in the caller's upload set.
#[derive(Debug, Clone)]
pub struct PendingGroup {
    pub group_filename: String,
    pub files: Vec<Arc<FileData>>,
}

type GroupPayload = Result<Vec<EncodedFile>, ConversionError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    #[serde(rename = "totalFiles")]
    pub total_files: usize,
    #[serde(rename = "uploadedFiles")]
    pub uploaded_files: usize,
    #[serde(rename = "failedFiles")]
    pub failed_files: usize,
    #[serde(rename = "failedGroups")]
    pub failed_groups: Vec<String>,
}

/// Groups the job's files by group, keeping only files whose bytes were
/// supplied. Groups without any supplied file are skipped.
pub fn collect_pending_groups(
    job: &UploadJob,
    supplied: &HashMap<String, Arc<FileData>>,
) -> Vec<PendingGroup> {
    job.groups
        .iter()
        .filter_map(|group| {
            let files: Vec<Arc<FileData>> = group
                .original_files
                .iter()
                .filter_map(|f| supplied.get(&f.filename).cloned())
                .collect();
            if files.is_empty() {
                None
            } else {
                Some(PendingGroup {
                    group_filename: group.group_filename.clone(),
                    files,
                })
            }
        })
        .collect()
}

async fn convert_batch(
    encoder: Arc<dyn PayloadEncoder>,
    batch: Vec<PendingGroup>,
) -> Vec<GroupPayload> {
    join_all(batch.into_iter().map(|group| {
        let encoder = encoder.clone();
        async move {
            let encoded = join_all(group.files.iter().map(|file| {
                let encoder = encoder.clone();
                let file = file.clone();
                async move {
                    let content = encoder.encode(file.clone()).await?;
                    Ok::<_, ConversionError>(EncodedFile {
                        filename: file.filename.clone(),
                        content,
                        content_type: file.mime_type.clone(),
                    })
                }
            }))
            .await;
            encoded.into_iter().collect::<GroupPayload>()
        }
    }))
    .await
}

/// Uploads a job's groups in fixed-size batches, converting batch `i + 1`
/// while batch `i` is being uploaded.
#[derive(Clone)]
pub struct BatchPipeliner {
    encoder: Arc<dyn PayloadEncoder>,
    repository: Arc<dyn JobRepository>,
    synchronizer: StatusSynchronizer,
    settings: PipelineSettings,
}

impl BatchPipeliner {
    pub fn new(
        encoder: Arc<dyn PayloadEncoder>,
        repository: Arc<dyn JobRepository>,
        synchronizer: StatusSynchronizer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            encoder,
            repository,
            synchronizer,
            settings,
        }
    }

    pub async fn run(
        &self,
        local: LocalJobState,
        files: Vec<FileData>,
        tracker: &ProgressTracker,
    ) -> PipelineReport {
        let supplied: HashMap<String, Arc<FileData>> = files
            .into_iter()
            .map(|f| (f.filename.clone(), Arc::new(f)))
            .collect();

        let (job_id, groups) = {
            let job = local.lock().unwrap();
            (job.job_id.clone(), collect_pending_groups(&job, &supplied))
        };

        let total_files: usize = groups.iter().map(|g| g.files.len()).sum();
        tracker.reset(total_files);

        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<Vec<PendingGroup>> =
            groups.chunks(batch_size).map(|chunk| chunk.to_vec()).collect();

        info!(
            "Uploading {} files in {} groups for job {} ({} batches of up to {})",
            total_files,
            groups.len(),
            job_id,
            batches.len(),
            batch_size
        );

        let mut failed_groups = Vec::new();
        let mut prefetched: Option<JoinHandle<Vec<GroupPayload>>> = None;

        for (index, batch) in batches.iter().enumerate() {
            let payloads = match prefetched.take() {
                Some(handle) => match handle.await {
                    Ok(payloads) => payloads,
                    Err(e) => {
                        warn!("Pre-conversion of batch {} did not finish: {}", index + 1, e);
                        batch
                            .iter()
                            .map(|_| Err(ConversionError::WorkerTerminated))
                            .collect()
                    }
                },
                None => convert_batch(self.encoder.clone(), batch.clone()).await,
            };

            prefetched = batches
                .get(index + 1)
                .map(|next| tokio::spawn(convert_batch(self.encoder.clone(), next.clone())));

            let results = join_all(batch.iter().zip(payloads).map(|(group, payload)| {
                self.upload_group(&local, &job_id, group, payload, tracker)
            }))
            .await;

            let failed_in_batch: Vec<String> = batch
                .iter()
                .zip(results)
                .filter(|(_, ok)| !ok)
                .map(|(group, _)| group.group_filename.clone())
                .collect();
            if !failed_in_batch.is_empty() {
                warn!(
                    "Batch {}/{} of job {} finished with {} failed groups: {:?}",
                    index + 1,
                    batches.len(),
                    job_id,
                    failed_in_batch.len(),
                    failed_in_batch
                );
            }
            failed_groups.extend(failed_in_batch);

            if index + 1 < batches.len() && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        let snapshot = tracker.snapshot();
        info!(
            "Job {} upload finished: {} uploaded, {} failed of {}",
            job_id, snapshot.uploaded_files, snapshot.failed_files, snapshot.total_files
        );

        PipelineReport {
            total_files: snapshot.total_files,
            uploaded_files: snapshot.uploaded_files,
            failed_files: snapshot.failed_files,
            failed_groups,
        }
    }

    /// Uploads one group. Returns false when the group failed; failures never
    /// propagate beyond the group.
    async fn upload_group(
        &self,
        local: &LocalJobState,
        job_id: &str,
        group: &PendingGroup,
        payload: GroupPayload,
        tracker: &ProgressTracker,
    ) -> bool {
        let filenames: Vec<String> = group.files.iter().map(|f| f.filename.clone()).collect();
        let updates_for = |status: FileStatus| -> Vec<FileStatusUpdate> {
            filenames
                .iter()
                .map(|name| FileStatusUpdate::new(name.clone(), status))
                .collect()
        };

        tracker.begin_upload();
        self.synchronizer
            .sync_group(local, &group.group_filename, updates_for(FileStatus::Uploading))
            .await;

        let result = match payload {
            Ok(encoded) => self
                .repository
                .bulk_upload(BulkUploadRequest {
                    files: encoded,
                    job_id: job_id.to_string(),
                    folder: self.settings.folder.clone(),
                })
                .await
                .map_err(|e| format!("{:?}", e)),
            Err(e) => Err(e.to_string()),
        };

        let succeeded = match result {
            Ok(()) => {
                self.synchronizer
                    .sync_group(local, &group.group_filename, updates_for(FileStatus::Uploaded))
                    .await;
                tracker.record_uploaded(filenames.len());
                true
            }
            Err(reason) => {
                error!(
                    "Upload of group '{}' (job {}, files {:?}) failed: {}",
                    group.group_filename, job_id, filenames, reason
                );
                self.synchronizer
                    .sync_group(
                        local,
                        &group.group_filename,
                        updates_for(FileStatus::UploadFailed),
                    )
                    .await;
                tracker.record_failed(filenames.len());
                false
            }
        };

        tracker.end_upload();
        succeeded
    }
}
