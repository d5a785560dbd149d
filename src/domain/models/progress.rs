use serde::Serialize;

/// Counters of one upload session.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    #[serde(rename = "totalFiles")]
    pub total_files: usize,
    #[serde(rename = "uploadedFiles")]
    pub uploaded_files: usize,
    #[serde(rename = "failedFiles")]
    pub failed_files: usize,
    #[serde(rename = "inFlight")]
    pub in_flight: usize,
}

impl ProgressSnapshot {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    pub fn settled(&self) -> usize {
        self.uploaded_files + self.failed_files
    }

    fn remaining(&self) -> usize {
        self.total_files.saturating_sub(self.settled())
    }

    /// Adds to the uploaded counter, never past `total_files`.
    pub fn add_uploaded(&mut self, count: usize) {
        self.uploaded_files += count.min(self.remaining());
    }

    /// Adds to the failed counter, never past `total_files`.
    pub fn add_failed(&mut self, count: usize) {
        self.failed_files += count.min(self.remaining());
    }

    pub fn is_terminal(&self) -> bool {
        self.total_files > 0
            && self.uploaded_files > 0
            && self.settled() == self.total_files
            && self.in_flight == 0
    }
}
