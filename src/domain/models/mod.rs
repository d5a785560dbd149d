pub mod file;
pub mod job;
pub mod progress;
pub mod upload_target;
