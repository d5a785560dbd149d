use serde::{Deserialize, Serialize};

use crate::domain::models::upload_target::PresignMethod;

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
pub struct PresignUrlRequest {
    pub method: PresignMethod,
    pub key: String,
    #[serde(rename = "expiresIn", default = "default_expires_in")]
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct PresignUrlResponse {
    pub url: String,
    pub method: PresignMethod,
}
