mod http_job_repository;

pub use http_job_repository::HttpJobRepository;
