use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::{
    application::{
        dto::status_dto::FileStatusUpdate, repositories::job_repository::JobRepository,
        services::job_cache::JobCache,
    },
    domain::models::job::{FileStatus, OriginalFile, UploadJob},
};

/// Job state owned by a single upload session.
pub type LocalJobState = Arc<Mutex<UploadJob>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The remote API accepted the update; `files` is the group state it echoed.
    Confirmed { files: Vec<OriginalFile> },
    /// The remote call failed; the requested statuses were written to local
    /// state only and the shared cache was left untouched.
    LocallyApplied {
        updates: Vec<FileStatusUpdate>,
        reason: String,
    },
}

impl SyncOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SyncOutcome::Confirmed { .. })
    }
}

#[derive(Clone)]
pub struct StatusSynchronizer {
    repository: Arc<dyn JobRepository>,
    cache: JobCache,
}

impl StatusSynchronizer {
    pub fn new(repository: Arc<dyn JobRepository>, cache: JobCache) -> Self {
        Self { repository, cache }
    }

    /// Pushes several status changes of one group in a single remote call and
    /// reconciles local state and the shared cache with the echoed state.
    pub async fn sync_group(
        &self,
        local: &LocalJobState,
        group_filename: &str,
        updates: Vec<FileStatusUpdate>,
    ) -> SyncOutcome {
        let job_id = local.lock().unwrap().job_id.clone();

        match self
            .repository
            .update_files_status(&job_id, group_filename, &updates)
            .await
        {
            Ok(files) => {
                debug!(
                    "Group '{}' of job {} confirmed with {} files",
                    group_filename,
                    job_id,
                    files.len()
                );
                self.reconcile(local, &job_id, group_filename, files.clone());
                SyncOutcome::Confirmed { files }
            }
            Err(e) => {
                let file_ids: Vec<&str> = updates.iter().map(|u| u.filename.as_str()).collect();
                warn!(
                    "Status update failed for job {} group '{}' files {:?}: {:?}; applying locally",
                    job_id, group_filename, file_ids, e
                );
                Self::apply_locally(local, group_filename, &updates);
                SyncOutcome::LocallyApplied {
                    updates,
                    reason: format!("{:?}", e),
                }
            }
        }
    }

    /// Single-file variant of [`StatusSynchronizer::sync_group`].
    pub async fn sync_file(
        &self,
        local: &LocalJobState,
        group_filename: &str,
        filename: &str,
        status: FileStatus,
    ) -> SyncOutcome {
        let job_id = local.lock().unwrap().job_id.clone();

        match self
            .repository
            .update_file_status(&job_id, group_filename, filename, status)
            .await
        {
            Ok(files) => {
                self.reconcile(local, &job_id, group_filename, files.clone());
                SyncOutcome::Confirmed { files }
            }
            Err(e) => {
                warn!(
                    "Status update failed for job {} group '{}' file '{}': {:?}; applying locally",
                    job_id, group_filename, filename, e
                );
                let updates = vec![FileStatusUpdate::new(filename, status)];
                Self::apply_locally(local, group_filename, &updates);
                SyncOutcome::LocallyApplied {
                    updates,
                    reason: format!("{:?}", e),
                }
            }
        }
    }

    fn reconcile(
        &self,
        local: &LocalJobState,
        job_id: &str,
        group_filename: &str,
        files: Vec<OriginalFile>,
    ) {
        let snapshot = {
            let mut job = local.lock().unwrap();
            job.replace_group_files(group_filename, files.clone());
            job.clone()
        };

        if !self.cache.apply_group_files(job_id, group_filename, files) {
            self.cache.insert(snapshot);
        }
    }

    fn apply_locally(local: &LocalJobState, group_filename: &str, updates: &[FileStatusUpdate]) {
        let mut job = local.lock().unwrap();
        for update in updates {
            if !job.set_status(group_filename, &update.filename, update.status) {
                warn!(
                    "File '{}' not found in group '{}' while applying local status",
                    update.filename, group_filename
                );
            }
        }
    }
}
