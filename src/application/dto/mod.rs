pub mod bulk_upload_dto;
pub mod status_dto;
