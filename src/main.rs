use std::sync::Arc;

use psd_upload_service::{
    adapters::repositories::HttpJobRepository,
    application::{
        repositories::job_repository::JobRepository,
        services::{PayloadEncoder, UploadTransport},
    },
    build_router,
    domain::config::settings::Settings,
    services::{self, ConversionWorker, HttpUploadTransport},
    AppState,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize AWS SDK crypto provider (required for aws-sdk-s3)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting psd-upload-service against Content Pipeline at {}",
        settings.content_pipeline_url
    );

    let cors = match &settings.cors_allowed_origins {
        Some(allowed_origins) => {
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        // Allow all origins if not specified (only for development)
        None => CorsLayer::permissive(),
    };

    let job_repository = Arc::new(HttpJobRepository::new(
        &settings.content_pipeline_url,
        settings.secrets.content_pipeline_api_key.clone(),
    )) as Arc<dyn JobRepository>;

    let encoder = Arc::new(ConversionWorker::spawn()) as Arc<dyn PayloadEncoder>;
    let transport =
        Arc::new(HttpUploadTransport::new(&settings.transport)) as Arc<dyn UploadTransport>;

    let presign_service = services::create_presign_service(&settings.secrets);
    if presign_service.is_none() {
        tracing::warn!("S3 is not configured; presigned uploads are disabled");
    }

    let app_state = AppState::new(
        &settings,
        job_repository,
        encoder,
        transport,
        presign_service,
    );
    let router = build_router(app_state, cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", settings.port);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}
