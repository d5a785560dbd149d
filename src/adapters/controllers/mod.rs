pub mod health_controller;
pub mod job_controller;
pub mod presign_controller;
pub mod upload_controller;
