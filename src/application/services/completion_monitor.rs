use std::time::Duration;

use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::models::progress::ProgressSnapshot;

/// Lower bound for the poll interval; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub type CompletionCallback = Box<dyn FnOnce(ProgressSnapshot) + Send>;

/// What happens the first time a session reaches its terminal state.
pub enum CompletionAction {
    Callback(CompletionCallback),
    /// Publishes `destination` on `target` once `delay` has elapsed.
    Redirect {
        destination: String,
        delay: Duration,
        target: watch::Sender<Option<String>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Active,
    Completed,
}

/// Watches the counters of one session and fires its action at most once.
///
/// The terminal condition is evaluated on every counter change and on a
/// fixed poll interval; both triggers go through the same one-shot guard.
pub struct CompletionMonitor {
    progress: watch::Receiver<ProgressSnapshot>,
    poll_interval: Duration,
    action: Option<CompletionAction>,
    state: watch::Sender<MonitorState>,
}

impl CompletionMonitor {
    pub fn new(
        progress: watch::Receiver<ProgressSnapshot>,
        poll_interval: Duration,
        action: CompletionAction,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Active);
        Self {
            progress,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            action: Some(action),
            state,
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    /// Checks the terminal condition against the latest counters. Returns true
    /// only on the call that performs the transition to `Completed`.
    pub fn evaluate(&mut self) -> bool {
        let snapshot = *self.progress.borrow_and_update();
        if !snapshot.is_terminal() {
            return false;
        }

        let Some(action) = self.action.take() else {
            return false;
        };

        self.state.send_replace(MonitorState::Completed);
        info!(
            "Upload session complete: {} uploaded, {} failed of {}",
            snapshot.uploaded_files, snapshot.failed_files, snapshot.total_files
        );

        match action {
            CompletionAction::Callback(callback) => callback(snapshot),
            CompletionAction::Redirect {
                destination,
                delay,
                target,
            } => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    debug!("Publishing completion redirect to {}", destination);
                    target.send_replace(Some(destination));
                });
            }
        }

        true
    }

    /// Runs until the session completes or the counters stop being updated.
    pub async fn run(mut self) -> MonitorState {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.evaluate();
            if self.state() == MonitorState::Completed {
                return MonitorState::Completed;
            }

            tokio::select! {
                changed = self.progress.changed() => {
                    if changed.is_err() {
                        self.evaluate();
                        return self.state();
                    }
                }
                _ = ticker.tick() => {}
            }
        }
    }
}
