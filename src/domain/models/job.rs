use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "uploaded")]
    Uploaded,
    #[serde(rename = "upload-failed")]
    UploadFailed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Uploading => "uploading",
            FileStatus::Uploaded => "uploaded",
            FileStatus::UploadFailed => "upload-failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OriginalFile {
    pub filename: String,
    pub file_path: String,
    pub status: FileStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileGroup {
    pub group_filename: String,
    #[serde(default)]
    pub original_files: Vec<OriginalFile>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadJob {
    pub job_id: String,
    #[serde(default)]
    pub groups: Vec<FileGroup>,
}

impl UploadJob {
    pub fn new(job_id: impl Into<String>, groups: Vec<FileGroup>) -> Self {
        Self {
            job_id: job_id.into(),
            groups,
        }
    }

    pub fn group(&self, group_filename: &str) -> Option<&FileGroup> {
        self.groups
            .iter()
            .find(|g| g.group_filename == group_filename)
    }

    pub fn file(&self, group_filename: &str, filename: &str) -> Option<&OriginalFile> {
        self.group(group_filename)?
            .original_files
            .iter()
            .find(|f| f.filename == filename)
    }

    /// Replaces the file list of a group with the state echoed by the remote
    /// API. Unknown groups are appended.
    pub fn replace_group_files(&mut self, group_filename: &str, files: Vec<OriginalFile>) {
        match self
            .groups
            .iter_mut()
            .find(|g| g.group_filename == group_filename)
        {
            Some(group) => group.original_files = files,
            None => self.groups.push(FileGroup {
                group_filename: group_filename.to_string(),
                original_files: files,
            }),
        }
    }

    /// Sets the status of one file. Returns false when the file is unknown.
    pub fn set_status(&mut self, group_filename: &str, filename: &str, status: FileStatus) -> bool {
        let file = self
            .groups
            .iter_mut()
            .find(|g| g.group_filename == group_filename)
            .and_then(|g| g.original_files.iter_mut().find(|f| f.filename == filename));

        match file {
            Some(file) => {
                file.status = status;
                true
            }
            None => false,
        }
    }

    pub fn count_with_status(&self, status: FileStatus) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.original_files.iter())
            .filter(|f| f.status == status)
            .count()
    }
}
