use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tokio::sync::watch;

use crate::domain::models::job::{OriginalFile, UploadJob};

/// Job snapshots shared by every upload session and HTTP reader, keyed by job
/// id. Writes are last-write-wins; subscribers see every write to their key.
#[derive(Clone, Default)]
pub struct JobCache {
    entries: Arc<RwLock<HashMap<String, watch::Sender<Option<UploadJob>>>>>,
}

impl JobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: &str) -> Option<UploadJob> {
        let entries = self.entries.read().unwrap();
        entries.get(job_id).and_then(|tx| tx.borrow().clone())
    }

    pub fn insert(&self, job: UploadJob) {
        let mut entries = self.entries.write().unwrap();
        let job_id = job.job_id.clone();
        match entries.get(&job_id) {
            Some(tx) => {
                tx.send_replace(Some(job));
            }
            None => {
                let (tx, _) = watch::channel(Some(job));
                entries.insert(job_id, tx);
            }
        }
    }

    /// Replaces one group's files inside the cached job. Returns false when
    /// the job is not cached.
    pub fn apply_group_files(
        &self,
        job_id: &str,
        group_filename: &str,
        files: Vec<OriginalFile>,
    ) -> bool {
        let entries = self.entries.read().unwrap();
        let Some(tx) = entries.get(job_id) else {
            return false;
        };

        tx.send_if_modified(|cached| match cached {
            Some(job) => {
                job.replace_group_files(group_filename, files);
                true
            }
            None => false,
        })
    }

    /// Receiver that yields the cached job for `job_id`, `None` until it is
    /// first inserted.
    pub fn subscribe(&self, job_id: &str) -> watch::Receiver<Option<UploadJob>> {
        let mut entries = self.entries.write().unwrap();
        entries
            .entry(job_id.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    pub fn remove(&self, job_id: &str) -> Option<UploadJob> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(job_id).and_then(|tx| tx.borrow().clone())
    }
}
