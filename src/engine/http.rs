//! HTTP transfer engine.
//!
//! Each transfer runs in its own tokio task which streams the response body
//! into the save path chunk by chunk, the same way a plain fetch does, but
//! stays controllable through its [`HttpTransferHandle`]:
//!
//! - pausing stops polling the body stream until the transfer is resumed
//! - cancelling, or dropping the handle, ends the transfer as `Cancelled`
//! - any HTTP or disk error ends it as `Interrupted`
//!
//! # Example
//!
//! ```rust,no_run
//! use modelfetch::engine::HttpEngine;
//! use modelfetch::http::HttpClientConfig;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), modelfetch::Error> {
//! let engine = HttpEngine::new(HttpClientConfig::default())?
//!     .progress_interval(Duration::from_millis(500));
//! # Ok(())
//! # }
//! ```

use super::{
    EngineEvent, EventSender, TransferEngine, TransferHandle, TransferId, TransferRequest,
    TransferState,
};
use crate::error::Result;
use crate::http::{create_http_client, HttpClientConfig};

use futures::StreamExt;
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::{fs, fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};

/// Requested run state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Running,
    Paused,
    Cancelled,
}

/// Progress counters shared between the transfer task and its handle.
#[derive(Debug)]
struct Progress {
    state: AtomicU8,
    total: AtomicU64,
    received: AtomicU64,
    paused: AtomicBool,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(TransferState::Progressing.as_u8()),
            total: AtomicU64::new(0),
            received: AtomicU64::new(0),
            paused: AtomicBool::new(false),
        }
    }
}

/// Handle on a transfer running inside an [`HttpEngine`].
#[derive(Debug)]
pub struct HttpTransferHandle {
    progress: Arc<Progress>,
    control: watch::Sender<Control>,
}

impl HttpTransferHandle {
    fn request(&self, control: Control) {
        self.control.send_if_modified(|current| {
            // Cancellation is final.
            if *current == Control::Cancelled || *current == control {
                return false;
            }
            *current = control;
            true
        });
    }
}

impl TransferHandle for HttpTransferHandle {
    fn state(&self) -> TransferState {
        TransferState::from_u8(self.progress.state.load(Ordering::Acquire))
    }

    fn total_bytes(&self) -> u64 {
        self.progress.total.load(Ordering::Acquire)
    }

    fn received_bytes(&self) -> u64 {
        self.progress.received.load(Ordering::Acquire)
    }

    fn is_paused(&self) -> bool {
        self.progress.paused.load(Ordering::Acquire)
    }

    fn pause(&self) {
        self.request(Control::Paused);
    }

    fn resume(&self) {
        self.request(Control::Running);
    }

    fn cancel(&self) {
        self.request(Control::Cancelled);
    }
}

/// Engine fetching transfers over HTTP(S).
#[derive(Clone)]
pub struct HttpEngine {
    client: ClientWithMiddleware,
    progress_interval: Duration,
}

impl fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEngine")
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl HttpEngine {
    /// Default minimum delay between two progress events of a transfer.
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

    /// Creates an engine with a client built from `config`.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::with_client(create_http_client(config)?))
    }

    /// Creates an engine around an existing client.
    pub fn with_client(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set the minimum delay between two progress events of a transfer.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

impl TransferEngine for HttpEngine {
    fn start_download(&self, request: TransferRequest, events: EventSender) {
        let progress = Arc::new(Progress::new());
        let (control_tx, control_rx) = watch::channel(Control::Running);

        events.send(EngineEvent::Started {
            transfer: request.id,
            handle: Box::new(HttpTransferHandle {
                progress: Arc::clone(&progress),
                control: control_tx,
            }),
        });

        let task = Transfer {
            client: self.client.clone(),
            request,
            progress,
            control: control_rx,
            events,
            interval: self.progress_interval,
        };
        tokio::spawn(task.run());
    }
}

/// State owned by one transfer task.
struct Transfer {
    client: ClientWithMiddleware,
    request: TransferRequest,
    progress: Arc<Progress>,
    control: watch::Receiver<Control>,
    events: EventSender,
    interval: Duration,
}

impl Transfer {
    async fn run(mut self) {
        let state = match self.fetch().await {
            Ok(state) => state,
            Err(e) => {
                warn!(url = %self.request.url, error = %e, "transfer interrupted");
                TransferState::Interrupted
            }
        };
        self.progress.paused.store(false, Ordering::Release);
        self.progress.state.store(state.as_u8(), Ordering::Release);
        self.events.send(EngineEvent::Done {
            transfer: self.request.id,
            state,
        });
    }

    fn id(&self) -> TransferId {
        self.request.id
    }

    fn notify(&self) {
        self.events.send(EngineEvent::Updated {
            transfer: self.id(),
            state: TransferState::Progressing,
        });
    }

    /// Fetches the body into the save path.
    async fn fetch(&mut self) -> Result<TransferState> {
        debug!("Fetching {}", &self.request.url);
        let res = self
            .client
            .get(self.request.url.as_str())
            .send()
            .await?
            .error_for_status()?;
        self.progress
            .total
            .store(res.content_length().unwrap_or(0), Ordering::Release);

        if let Some(dir) = self.request.save_path.parent() {
            fs::create_dir_all(dir).await?;
        }
        debug!("Creating staging file {:?}", &self.request.save_path);
        let mut file = File::create(&self.request.save_path).await?;

        let mut stream = res.bytes_stream();
        let mut last_notified = Instant::now();
        loop {
            // The handle is gone with its session.
            if self.control.has_changed().is_err() {
                return Ok(TransferState::Cancelled);
            }
            let control = *self.control.borrow_and_update();
            match control {
                Control::Cancelled => return Ok(TransferState::Cancelled),
                Control::Paused => {
                    if !self.progress.paused.swap(true, Ordering::AcqRel) {
                        file.flush().await?;
                        self.notify();
                    }
                    if self.control.changed().await.is_err() {
                        return Ok(TransferState::Cancelled);
                    }
                    continue;
                }
                Control::Running => {
                    if self.progress.paused.swap(false, Ordering::AcqRel) {
                        self.notify();
                    }
                }
            }

            tokio::select! {
                biased;

                changed = self.control.changed() => {
                    if changed.is_err() {
                        return Ok(TransferState::Cancelled);
                    }
                }
                item = stream.next() => {
                    let Some(chunk) = item else { break };
                    let mut chunk = chunk?;
                    let size = chunk.len() as u64;
                    file.write_all_buf(&mut chunk).await?;
                    self.progress.received.fetch_add(size, Ordering::AcqRel);

                    if last_notified.elapsed() >= self.interval {
                        last_notified = Instant::now();
                        self.notify();
                    }
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(TransferState::Completed)
    }
}
