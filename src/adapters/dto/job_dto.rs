use serde::Serialize;

use crate::domain::models::job::OriginalFile;

#[derive(Debug, Serialize)]
pub struct SingleUploadResponse {
    /// False when the status could only be applied locally.
    pub confirmed: bool,
    pub file: Option<OriginalFile>,
}
