pub mod job_dto;
pub mod presign_dto;
pub mod upload_dto;
