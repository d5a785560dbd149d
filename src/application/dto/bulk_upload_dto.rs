use serde::{Deserialize, Serialize};

use crate::domain::models::file::EncodedFile;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BulkUploadRequest {
    pub files: Vec<EncodedFile>,
    pub job_id: String,
    pub folder: String,
}
