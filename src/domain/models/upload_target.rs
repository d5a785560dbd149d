use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    #[serde(rename = "get")]
    Get,
    #[serde(rename = "put")]
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresignRequest {
    pub method: PresignMethod,
    pub key: String,
    pub expires_in_secs: u64,
}

/// Where and how the bytes of a file must be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadTarget {
    /// Single presigned URL receiving the raw bytes.
    Direct { url: String },
    /// Policy-based form upload: `fields` go first, the file part last.
    Form {
        url: String,
        fields: BTreeMap<String, String>,
        method: String,
    },
}

impl UploadTarget {
    pub fn url(&self) -> &str {
        match self {
            UploadTarget::Direct { url } | UploadTarget::Form { url, .. } => url,
        }
    }
}
