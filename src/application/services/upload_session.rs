use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    application::{
        error::ApplicationError,
        services::{
            batch_pipeliner::{BatchPipeliner, PipelineReport},
            completion_monitor::{
                CompletionAction, CompletionCallback, CompletionMonitor, MonitorState,
            },
            job_cache::JobCache,
            progress_tracker::ProgressTracker,
        },
    },
    domain::{
        config::settings::CompletionSettings,
        models::{file::FileData, job::UploadJob, progress::ProgressSnapshot},
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    pub progress: ProgressSnapshot,
    pub completed: bool,
    pub finished: bool,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    pub report: Option<PipelineReport>,
    /// Latest confirmed snapshot of the job's file statuses.
    pub job: Option<UploadJob>,
}

struct SessionHandle {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    progress: watch::Receiver<ProgressSnapshot>,
    monitor_state: watch::Receiver<MonitorState>,
    redirect: watch::Receiver<Option<String>>,
    report: watch::Receiver<Option<PipelineReport>>,
    job: watch::Receiver<Option<UploadJob>>,
}

impl SessionHandle {
    fn is_finished(&self) -> bool {
        self.report.borrow().is_some()
    }

    fn status(&self, job_id: &str) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id,
            job_id: job_id.to_string(),
            started_at: self.started_at,
            progress: *self.progress.borrow(),
            completed: *self.monitor_state.borrow() == MonitorState::Completed,
            finished: self.is_finished(),
            redirect_to: self.redirect.borrow().clone(),
            report: self.report.borrow().clone(),
            job: self.job.borrow().clone(),
        }
    }
}

/// One upload session per job: pipeliner, counters and completion monitor.
#[derive(Clone)]
pub struct UploadSessions {
    pipeliner: BatchPipeliner,
    completion: CompletionSettings,
    cache: JobCache,
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl UploadSessions {
    pub fn new(pipeliner: BatchPipeliner, completion: CompletionSettings, cache: JobCache) -> Self {
        Self {
            pipeliner,
            completion,
            cache,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts uploading `files` for `job`. Without `on_complete`, completion
    /// publishes the configured redirect destination after its delay.
    pub fn start(
        &self,
        job: UploadJob,
        files: Vec<FileData>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<SessionStatus, ApplicationError> {
        let job_id = job.job_id.clone();
        let mut sessions = self.sessions.lock().unwrap();

        if sessions.get(&job_id).is_some_and(|s| !s.is_finished()) {
            return Err(ApplicationError::Conflict(format!(
                "An upload session is already running for job {}",
                job_id
            )));
        }

        self.cache.insert(job.clone());
        let job_rx = self.cache.subscribe(&job_id);

        let tracker = ProgressTracker::new();
        let (redirect_tx, redirect_rx) = watch::channel(None);
        let action = match on_complete {
            Some(callback) => CompletionAction::Callback(callback),
            None => CompletionAction::Redirect {
                destination: self.completion.redirect_to.clone(),
                delay: self.completion.redirect_delay,
                target: redirect_tx,
            },
        };

        let monitor =
            CompletionMonitor::new(tracker.subscribe(), self.completion.poll_interval, action);
        let monitor_state = monitor.subscribe_state();
        let (report_tx, report_rx) = watch::channel(None);

        let handle = SessionHandle {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            progress: tracker.subscribe(),
            monitor_state,
            redirect: redirect_rx,
            report: report_rx,
            job: job_rx,
        };
        info!(
            "Starting upload session {} for job {} with {} files",
            handle.session_id,
            job_id,
            files.len()
        );

        tokio::spawn(monitor.run());

        let pipeliner = self.pipeliner.clone();
        let local = Arc::new(Mutex::new(job));
        let registry = self.clone();
        let session_id = handle.session_id;
        let evicted_job = job_id.clone();
        tokio::spawn(async move {
            let report = pipeliner.run(local, files, &tracker).await;
            report_tx.send_replace(Some(report));
            // Dropping the tracker lets the monitor stop once counters settle.
            drop(tracker);

            tokio::time::sleep(registry.completion.session_retention).await;
            registry.evict(&evicted_job, session_id);
        });

        let status = handle.status(&job_id);
        sessions.insert(job_id, handle);
        Ok(status)
    }

    /// Forgets a finished session and its cached job, unless a newer session
    /// for the same job has replaced it.
    fn evict(&self, job_id: &str, session_id: Uuid) {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions
            .get(job_id)
            .is_some_and(|s| s.session_id == session_id)
        {
            sessions.remove(job_id);
            self.cache.remove(job_id);
            debug!("Evicted upload session {} for job {}", session_id, job_id);
        }
    }

    pub fn status(&self, job_id: &str) -> Option<SessionStatus> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(job_id).map(|s| s.status(job_id))
    }
}
