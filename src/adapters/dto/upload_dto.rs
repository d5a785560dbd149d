use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadForwardResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadErrorResponse {
    pub error: String,
    pub details: String,
}
