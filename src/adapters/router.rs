use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::adapters::{
    controllers::{
        health_controller::HealthController, job_controller::JobController,
        presign_controller::PresignController,
        upload_controller::{UploadController, MAX_UPLOAD_BYTES},
    },
    middleware::validate_service_secret,
    state::AppState,
};

async fn hello_world() -> &'static str {
    "psd-upload-service"
}

pub fn build_router(app_state: AppState, cors: CorsLayer) -> Router {
    // Every API route requires the X-Service-Secret header
    let protected_routes = Router::new()
        .route("/api/v1/health", get(HealthController::health_check))
        .route("/api/v1/upload", put(UploadController::forward_upload))
        .route(
            "/api/v1/presigned-url",
            post(PresignController::create_presigned_url),
        )
        .route("/api/v1/jobs/{job_id}", get(JobController::get_job))
        .route(
            "/api/v1/jobs/{job_id}/uploads",
            post(JobController::start_upload).get(JobController::upload_status),
        )
        .route(
            "/api/v1/jobs/{job_id}/files/{group}/{filename}",
            post(JobController::upload_single_file),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            validate_service_secret,
        ));

    Router::new()
        .route("/", get(hello_world))
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state)
}
