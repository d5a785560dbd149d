#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use psd_upload_service::{
    application::{
        dto::{bulk_upload_dto::BulkUploadRequest, status_dto::FileStatusUpdate},
        error::ApplicationError,
        repositories::job_repository::JobRepository,
        services::PayloadEncoder,
    },
    domain::{
        config::settings::Settings,
        models::{
            file::FileData,
            job::{FileGroup, FileStatus, OriginalFile, UploadJob},
        },
    },
    services::{encode_base64, ConversionError},
};

pub const TEST_SECRET: &str = "test-secret";

/// Ordered log of what the fakes observed.
#[derive(Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<String>>>,
}

impl Timeline {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {} not recorded", event))
    }
}

pub fn test_settings(extra: &[(&str, &str)]) -> Settings {
    let mut pairs: Vec<(String, String)> = vec![
        ("SERVICE_SECRET".to_string(), TEST_SECRET.to_string()),
        (
            "CONTENT_PIPELINE_URL".to_string(),
            "http://127.0.0.1:9".to_string(),
        ),
        ("UPLOAD_BATCH_DELAY_MS".to_string(), "0".to_string()),
        ("COMPLETION_POLL_MS".to_string(), "20".to_string()),
        ("COMPLETION_REDIRECT_MS".to_string(), "10".to_string()),
    ];
    for (k, v) in extra {
        pairs.retain(|(key, _)| key != k);
        pairs.push((k.to_string(), v.to_string()));
    }
    Settings::from_lookup(move |key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("test settings should be valid")
}

/// Job with `groups` single-file groups named `g0.psd`, `g1.psd`, ...
pub fn job_with_groups(job_id: &str, groups: usize) -> UploadJob {
    UploadJob::new(
        job_id,
        (0..groups)
            .map(|i| {
                let name = format!("g{}.psd", i);
                FileGroup {
                    group_filename: name.clone(),
                    original_files: vec![OriginalFile {
                        filename: name.clone(),
                        file_path: format!("jobs/{}/{}", job_id, name),
                        status: FileStatus::Pending,
                    }],
                }
            })
            .collect(),
    )
}

pub fn psd_file(name: &str) -> FileData {
    FileData::new(
        format!("8BPS-{}", name).into_bytes(),
        name.to_string(),
        "image/vnd.adobe.photoshop".to_string(),
    )
}

pub fn files_for(job: &UploadJob) -> Vec<FileData> {
    job.groups
        .iter()
        .flat_map(|g| g.original_files.iter())
        .map(|f| psd_file(&f.filename))
        .collect()
}

/// In-memory stand-in for the Content Pipeline API.
pub struct FakeJobRepository {
    job: Mutex<Option<UploadJob>>,
    timeline: Timeline,
    upload_delay: Duration,
    fail_status_updates: AtomicBool,
    failing_uploads: Mutex<HashSet<String>>,
    pub status_calls: AtomicUsize,
    pub bulk_requests: Mutex<Vec<BulkUploadRequest>>,
}

impl FakeJobRepository {
    pub fn new(job: Option<UploadJob>, timeline: Timeline, upload_delay: Duration) -> Self {
        Self {
            job: Mutex::new(job),
            timeline,
            upload_delay,
            fail_status_updates: AtomicBool::new(false),
            failing_uploads: Mutex::new(HashSet::new()),
            status_calls: AtomicUsize::new(0),
            bulk_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_status_updates(&self) {
        self.fail_status_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_upload_of(&self, filename: &str) {
        self.failing_uploads
            .lock()
            .unwrap()
            .insert(filename.to_string());
    }

    pub fn stored_job(&self) -> Option<UploadJob> {
        self.job.lock().unwrap().clone()
    }

    fn apply(
        &self,
        group_filename: &str,
        updates: &[FileStatusUpdate],
    ) -> Result<Vec<OriginalFile>, ApplicationError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(ApplicationError::Upstream {
                status: 503,
                body: "status service unavailable".to_string(),
            });
        }

        let mut guard = self.job.lock().unwrap();
        let job = guard.as_mut().ok_or(ApplicationError::NotFound)?;
        for update in updates {
            job.set_status(group_filename, &update.filename, update.status);
        }
        Ok(job
            .group(group_filename)
            .map(|g| g.original_files.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl JobRepository for FakeJobRepository {
    async fn get_job(&self, _job_id: &str) -> Result<UploadJob, ApplicationError> {
        self.stored_job().ok_or(ApplicationError::NotFound)
    }

    async fn update_files_status(
        &self,
        _job_id: &str,
        group_filename: &str,
        updates: &[FileStatusUpdate],
    ) -> Result<Vec<OriginalFile>, ApplicationError> {
        self.apply(group_filename, updates)
    }

    async fn update_file_status(
        &self,
        _job_id: &str,
        group_filename: &str,
        filename: &str,
        status: FileStatus,
    ) -> Result<Vec<OriginalFile>, ApplicationError> {
        self.apply(group_filename, &[FileStatusUpdate::new(filename, status)])
    }

    async fn bulk_upload(&self, request: BulkUploadRequest) -> Result<(), ApplicationError> {
        let names: Vec<String> = request.files.iter().map(|f| f.filename.clone()).collect();
        for name in &names {
            self.timeline.record(format!("upload-start:{}", name));
        }

        tokio::time::sleep(self.upload_delay).await;

        for name in &names {
            self.timeline.record(format!("upload-end:{}", name));
        }

        let failing = self.failing_uploads.lock().unwrap().clone();
        self.bulk_requests.lock().unwrap().push(request);

        if names.iter().any(|n| failing.contains(n)) {
            return Err(ApplicationError::Upstream {
                status: 500,
                body: "bulk upload rejected".to_string(),
            });
        }
        Ok(())
    }
}

/// Encoder that logs each conversion and can be told to fail for some files.
#[derive(Clone, Default)]
pub struct RecordingEncoder {
    timeline: Timeline,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingEncoder {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            failing: Arc::default(),
        }
    }

    pub fn fail_for(&self, filename: &str) {
        self.failing.lock().unwrap().insert(filename.to_string());
    }
}

#[async_trait]
impl PayloadEncoder for RecordingEncoder {
    async fn encode(&self, file: Arc<FileData>) -> Result<String, ConversionError> {
        self.timeline.record(format!("convert:{}", file.filename));
        tokio::task::yield_now().await;

        if self.failing.lock().unwrap().contains(&file.filename) {
            return Err(ConversionError::Failed {
                filename: file.filename.clone(),
                reason: "corrupt file".to_string(),
            });
        }
        Ok(encode_base64(&file.content))
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
