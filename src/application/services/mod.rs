pub mod batch_pipeliner;
pub mod completion_monitor;
pub mod job_cache;
pub mod payload_encoder;
pub mod presign_service;
pub mod progress_tracker;
pub mod single_file_upload;
pub mod status_sync;
pub mod upload_session;
pub mod upload_transport;

pub use payload_encoder::PayloadEncoder;
pub use presign_service::PresignService;
pub use upload_transport::UploadTransport;
