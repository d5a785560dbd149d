use tokio::sync::watch;

use crate::domain::models::progress::ProgressSnapshot;

/// Upload counters of one session. Every mutation notifies subscribers.
#[derive(Clone)]
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ProgressSnapshot::default());
        Self { tx }
    }

    pub fn reset(&self, total_files: usize) {
        self.tx.send_replace(ProgressSnapshot::new(total_files));
    }

    pub fn record_uploaded(&self, count: usize) {
        self.tx.send_modify(|p| p.add_uploaded(count));
    }

    pub fn record_failed(&self, count: usize) {
        self.tx.send_modify(|p| p.add_failed(count));
    }

    pub fn begin_upload(&self) {
        self.tx.send_modify(|p| p.in_flight += 1);
    }

    pub fn end_upload(&self) {
        self.tx
            .send_modify(|p| p.in_flight = p.in_flight.saturating_sub(1));
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }
}
