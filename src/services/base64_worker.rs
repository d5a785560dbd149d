use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc as std_mpsc, Arc, Mutex,
    },
    thread,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    application::services::PayloadEncoder, domain::models::file::FileData,
    services::error::ConversionError,
};

type EncodeFn = fn(&[u8]) -> String;
type Responder = oneshot::Sender<Result<String, ConversionError>>;

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

struct ConversionJob {
    id: u64,
    file: Arc<FileData>,
}

struct WorkerChannel {
    requests: Mutex<Option<std_mpsc::Sender<ConversionJob>>>,
    pending: Arc<Mutex<HashMap<u64, Responder>>>,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
}

/// Base64 encoder backed by a dedicated OS thread.
///
/// Requests carry a generated id; the thread answers over a channel and a
/// dispatcher task hands each answer to the matching pending request. When
/// the thread cannot be spawned, encoding runs synchronously on the caller.
pub struct ConversionWorker {
    channel: Option<WorkerChannel>,
}

impl ConversionWorker {
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        Self::spawn_with(encode_base64)
    }

    /// Encoder without a background thread.
    pub fn synchronous() -> Self {
        Self { channel: None }
    }

    pub(crate) fn spawn_with(encode: EncodeFn) -> Self {
        let (request_tx, request_rx) = std_mpsc::channel::<ConversionJob>();
        let (response_tx, mut response_rx) =
            mpsc::unbounded_channel::<(u64, Result<String, ConversionError>)>();

        let spawned = thread::Builder::new()
            .name("base64-worker".to_string())
            .spawn(move || {
                for job in request_rx {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| encode(&job.file.content)))
                        .map_err(|_| ConversionError::Failed {
                            filename: job.file.filename.clone(),
                            reason: "encoder panicked".to_string(),
                        });
                    if response_tx.send((job.id, result)).is_err() {
                        break;
                    }
                }
            });

        if let Err(e) = spawned {
            warn!(
                "Could not start base64 worker thread, encoding synchronously: {}",
                e
            );
            return Self::synchronous();
        }

        let pending: Arc<Mutex<HashMap<u64, Responder>>> = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = {
            let pending = pending.clone();
            tokio::spawn(async move {
                while let Some((id, result)) = response_rx.recv().await {
                    let responder = pending.lock().unwrap().remove(&id);
                    match responder {
                        Some(tx) => {
                            let _ = tx.send(result);
                        }
                        None => debug!("Dropping answer for unknown conversion request {}", id),
                    }
                }
            })
        };

        Self {
            channel: Some(WorkerChannel {
                requests: Mutex::new(Some(request_tx)),
                pending,
                next_id: AtomicU64::new(1),
                dispatcher,
            }),
        }
    }

    pub fn is_threaded(&self) -> bool {
        self.channel.is_some()
    }

    pub fn pending_requests(&self) -> usize {
        self.channel
            .as_ref()
            .map(|c| c.pending.lock().unwrap().len())
            .unwrap_or(0)
    }

    /// Stops the worker and rejects every outstanding request.
    pub fn shutdown(&self) {
        let Some(channel) = &self.channel else {
            return;
        };

        channel.requests.lock().unwrap().take();

        let outstanding: Vec<Responder> = channel
            .pending
            .lock()
            .unwrap()
            .drain()
            .map(|(_, tx)| tx)
            .collect();
        if !outstanding.is_empty() {
            debug!(
                "Rejecting {} pending conversion requests",
                outstanding.len()
            );
        }
        for tx in outstanding {
            let _ = tx.send(Err(ConversionError::WorkerTerminated));
        }

        channel.dispatcher.abort();
    }
}

impl Drop for ConversionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl PayloadEncoder for ConversionWorker {
    async fn encode(&self, file: Arc<FileData>) -> Result<String, ConversionError> {
        let Some(channel) = &self.channel else {
            return Ok(encode_base64(&file.content));
        };

        let id = channel.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        channel.pending.lock().unwrap().insert(id, tx);

        let sent = {
            let requests = channel.requests.lock().unwrap();
            match requests.as_ref() {
                Some(sender) => sender.send(ConversionJob { id, file }).is_ok(),
                None => false,
            }
        };
        if !sent {
            channel.pending.lock().unwrap().remove(&id);
            return Err(ConversionError::WorkerTerminated);
        }

        rx.await.map_err(|_| ConversionError::WorkerTerminated)?
    }
}
