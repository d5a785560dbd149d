use serde::{Deserialize, Serialize};

use crate::domain::models::job::{FileStatus, OriginalFile};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileStatusUpdate {
    pub filename: String,
    pub status: FileStatus,
}

impl FileStatusUpdate {
    pub fn new(filename: impl Into<String>, status: FileStatus) -> Self {
        Self {
            filename: filename.into(),
            status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupStatusUpdateRequest {
    pub group_filename: String,
    pub updates: Vec<FileStatusUpdate>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SingleStatusUpdateRequest {
    pub group_filename: String,
    pub filename: String,
    pub status: FileStatus,
}

/// Full file state of a group as echoed by the Content Pipeline.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupFilesResponse {
    pub group_filename: String,
    #[serde(default)]
    pub files: Vec<OriginalFile>,
}
