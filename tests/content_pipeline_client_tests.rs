//! Content Pipeline client wire format against a local fake pipeline.

mod common;

use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use common::{job_with_groups, spawn_server};
use psd_upload_service::{
    adapters::repositories::HttpJobRepository,
    application::{
        dto::{bulk_upload_dto::BulkUploadRequest, status_dto::FileStatusUpdate},
        error::ApplicationError,
        repositories::job_repository::JobRepository,
    },
    domain::models::{file::EncodedFile, job::FileStatus},
};
use serde_json::{json, Value};

const API_KEY: &str = "pipeline-key";

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: Option<String>,
    api_key: Option<String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn echo_files(body: &Value) -> Value {
    let updates = match body.get("updates") {
        Some(updates) => updates.as_array().cloned().unwrap_or_default(),
        None => vec![json!({"filename": body["filename"], "status": body["status"]})],
    };
    let files: Vec<Value> = updates
        .iter()
        .map(|u| {
            let filename = u["filename"].as_str().unwrap_or_default();
            json!({
                "filename": filename,
                "file_path": format!("jobs/job-1/{}", filename),
                "status": u["status"],
            })
        })
        .collect();
    json!({"group_filename": body["group_filename"], "files": files})
}

async fn pipeline(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    log.lock().unwrap().push(Seen {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    match (method.as_str(), uri.path()) {
        ("GET", "/api/jobs/job-1") => Json(job_with_groups("job-1", 2)).into_response(),
        ("POST" | "PUT", "/api/jobs/job-1/files/status") => {
            Json(echo_files(&body)).into_response()
        }
        ("POST", "/api/files/bulk-upload") if body["job_id"] == "broken" => {
            (StatusCode::INTERNAL_SERVER_ERROR, "pipeline down").into_response()
        }
        ("POST", "/api/files/bulk-upload") => Json(json!({"ok": true})).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn fake_pipeline(api_key: Option<&str>) -> (HttpJobRepository, Log) {
    let log = Log::default();
    let router = Router::new().fallback(pipeline).with_state(log.clone());
    let base = spawn_server(router).await;
    let repository = HttpJobRepository::new(
        &format!("{}/api/", base),
        api_key.map(str::to_string),
    );
    (repository, log)
}

fn last(log: &Log) -> Seen {
    log.lock().unwrap().last().cloned().expect("no request seen")
}

#[tokio::test]
async fn get_job_parses_record_and_sends_api_key() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    let job = repository.get_job("job-1").await.unwrap();

    assert_eq!(job, job_with_groups("job-1", 2));
    let seen = last(&log);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/jobs/job-1");
    assert_eq!(seen.api_key.as_deref(), Some(API_KEY));
}

#[tokio::test]
async fn api_key_header_is_omitted_when_unset() {
    let (repository, log) = fake_pipeline(None).await;

    repository.get_job("job-1").await.unwrap();

    assert!(last(&log).api_key.is_none());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (repository, _log) = fake_pipeline(Some(API_KEY)).await;

    let err = repository.get_job("job-404").await.unwrap_err();

    assert!(matches!(err, ApplicationError::NotFound), "got {:?}", err);
}

#[tokio::test]
async fn job_id_stays_inside_its_path_segment() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    let err = repository.get_job("../admin/delete?x=").await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound), "got {:?}", err);

    let seen = last(&log);
    assert!(seen.path.starts_with("/api/jobs/"), "path was {}", seen.path);
    assert!(!seen.path.contains("/admin"), "path was {}", seen.path);
    assert_eq!(seen.path.matches('/').count(), 3, "path was {}", seen.path);
    assert!(seen.query.is_none());
}

#[tokio::test]
async fn dot_segment_ids_are_refused_before_sending() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    for job_id in ["..", ".", ""] {
        let err = repository.get_job(job_id).await.unwrap_err();
        assert!(matches!(err, ApplicationError::BadRequest(_)), "got {:?}", err);
    }
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn group_status_update_posts_batched_body() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    let files = repository
        .update_files_status(
            "job-1",
            "g0.psd",
            &[
                FileStatusUpdate::new("g0.psd", FileStatus::Uploading),
                FileStatusUpdate::new("g0-mask.psd", FileStatus::Uploading),
            ],
        )
        .await
        .unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/jobs/job-1/files/status");
    assert_eq!(seen.api_key.as_deref(), Some(API_KEY));
    assert_eq!(
        seen.body,
        json!({
            "group_filename": "g0.psd",
            "updates": [
                {"filename": "g0.psd", "status": "uploading"},
                {"filename": "g0-mask.psd", "status": "uploading"},
            ],
        })
    );

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.status == FileStatus::Uploading));
    assert_eq!(files[0].file_path, "jobs/job-1/g0.psd");
}

#[tokio::test]
async fn single_status_update_puts_file_body() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    let files = repository
        .update_file_status("job-1", "g1.psd", "g1.psd", FileStatus::UploadFailed)
        .await
        .unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::PUT);
    assert_eq!(seen.path, "/api/jobs/job-1/files/status");
    assert_eq!(
        seen.body,
        json!({"group_filename": "g1.psd", "filename": "g1.psd", "status": "upload-failed"})
    );
    assert_eq!(files[0].status, FileStatus::UploadFailed);
}

#[tokio::test]
async fn bulk_upload_posts_payload_with_job_and_folder() {
    let (repository, log) = fake_pipeline(Some(API_KEY)).await;

    repository
        .bulk_upload(BulkUploadRequest {
            files: vec![EncodedFile {
                filename: "g0.psd".to_string(),
                content: "OEJQUw==".to_string(),
                content_type: "image/vnd.adobe.photoshop".to_string(),
            }],
            job_id: "job-1".to_string(),
            folder: "originals".to_string(),
        })
        .await
        .unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/files/bulk-upload");
    assert_eq!(seen.api_key.as_deref(), Some(API_KEY));
    assert_eq!(
        seen.body,
        json!({
            "files": [{
                "filename": "g0.psd",
                "content": "OEJQUw==",
                "content_type": "image/vnd.adobe.photoshop",
            }],
            "job_id": "job-1",
            "folder": "originals",
        })
    );
}

#[tokio::test]
async fn failed_bulk_upload_carries_upstream_status_and_body() {
    let (repository, _log) = fake_pipeline(Some(API_KEY)).await;

    let err = repository
        .bulk_upload(BulkUploadRequest {
            files: Vec::new(),
            job_id: "broken".to_string(),
            folder: "originals".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        ApplicationError::Upstream { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "pipeline down");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}
