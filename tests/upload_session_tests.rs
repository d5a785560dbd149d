//! Upload sessions wire the pipeliner to the completion monitor.

mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use common::{files_for, job_with_groups, test_settings, FakeJobRepository, RecordingEncoder, Timeline};
use psd_upload_service::{
    application::{
        error::ApplicationError,
        services::{
            batch_pipeliner::BatchPipeliner,
            job_cache::JobCache,
            status_sync::StatusSynchronizer,
            upload_session::{SessionStatus, UploadSessions},
        },
    },
    domain::models::job::FileStatus,
};

fn registry(
    repository: Arc<FakeJobRepository>,
    timeline: Timeline,
    extra: &[(&str, &str)],
) -> (UploadSessions, JobCache) {
    let settings = test_settings(extra);
    let cache = JobCache::new();
    let synchronizer = StatusSynchronizer::new(repository.clone(), cache.clone());
    let pipeliner = BatchPipeliner::new(
        Arc::new(RecordingEncoder::new(timeline)),
        repository,
        synchronizer,
        settings.pipeline,
    );
    (
        UploadSessions::new(pipeliner, settings.completion, cache.clone()),
        cache,
    )
}

fn sessions(repository: Arc<FakeJobRepository>, timeline: Timeline) -> UploadSessions {
    registry(repository, timeline, &[]).0
}

async fn wait_until<F>(sessions: &UploadSessions, job_id: &str, done: F) -> SessionStatus
where
    F: Fn(&SessionStatus) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(status) = sessions.status(job_id) {
                if done(&status) {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session did not reach the expected state")
}

#[tokio::test]
async fn completion_callback_fires_exactly_once() {
    let job = job_with_groups("job-s1", 7);
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(
        Some(job.clone()),
        timeline.clone(),
        Duration::from_millis(5),
    ));
    let sessions = sessions(repository, timeline);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    sessions
        .start(
            job.clone(),
            files_for(&job),
            Some(Box::new(move |snapshot| {
                assert_eq!(snapshot.uploaded_files, 7);
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();

    let status = wait_until(&sessions, "job-s1", |s| s.completed && s.finished).await;
    // Several poll intervals pass after completion.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.progress.uploaded_files, 7);
    assert!(status.redirect_to.is_none());

    let job = status.job.expect("session should expose the job");
    assert_eq!(job.count_with_status(FileStatus::Uploaded), 7);
}

#[tokio::test]
async fn default_completion_publishes_redirect() {
    let job = job_with_groups("job-s2", 2);
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(
        Some(job.clone()),
        timeline.clone(),
        Duration::from_millis(1),
    ));
    let sessions = sessions(repository, timeline);

    sessions.start(job.clone(), files_for(&job), None).unwrap();

    let status = wait_until(&sessions, "job-s2", |s| s.redirect_to.is_some()).await;
    assert!(status.completed);
    assert_eq!(status.redirect_to.as_deref(), Some("/jobs"));
}

#[tokio::test]
async fn all_failed_session_finishes_without_completing() {
    let job = job_with_groups("job-s3", 2);
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(
        Some(job.clone()),
        timeline.clone(),
        Duration::from_millis(1),
    ));
    repository.fail_upload_of("g0.psd");
    repository.fail_upload_of("g1.psd");
    let sessions = sessions(repository, timeline);

    sessions.start(job.clone(), files_for(&job), None).unwrap();

    let status = wait_until(&sessions, "job-s3", |s| s.finished).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    let status_later = sessions.status("job-s3").unwrap();

    assert_eq!(status.progress.failed_files, 2);
    assert!(!status_later.completed);
    assert!(status_later.redirect_to.is_none());
}

#[tokio::test]
async fn running_session_rejects_second_start() {
    let job = job_with_groups("job-s4", 1);
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(
        Some(job.clone()),
        timeline.clone(),
        Duration::from_millis(300),
    ));
    let sessions = sessions(repository, timeline);

    sessions.start(job.clone(), files_for(&job), None).unwrap();
    let second = sessions.start(job.clone(), files_for(&job), None);
    assert!(matches!(second, Err(ApplicationError::Conflict(_))));

    wait_until(&sessions, "job-s4", |s| s.finished).await;
    assert!(sessions.start(job.clone(), files_for(&job), None).is_ok());
}

#[tokio::test]
async fn unknown_job_has_no_session() {
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(None, timeline.clone(), Duration::ZERO));
    let sessions = sessions(repository, timeline);

    assert!(sessions.status("missing").is_none());
}

#[tokio::test]
async fn finished_session_is_evicted_after_retention() {
    let job = job_with_groups("job-s5", 1);
    let timeline = Timeline::default();
    let repository = Arc::new(FakeJobRepository::new(
        Some(job.clone()),
        timeline.clone(),
        Duration::from_millis(1),
    ));
    let (sessions, cache) =
        registry(repository, timeline, &[("SESSION_RETENTION_MS", "150")]);

    sessions.start(job.clone(), files_for(&job), None).unwrap();
    wait_until(&sessions, "job-s5", |s| s.finished).await;
    assert!(cache.get("job-s5").is_some());

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(sessions.status("job-s5").is_none());
    assert!(cache.get("job-s5").is_none());
    assert!(sessions.start(job.clone(), files_for(&job), None).is_ok());
}
