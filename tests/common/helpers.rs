#![allow(dead_code)]

use modelfetch::download::{DownloadRequest, ModelType};
use modelfetch::engine::{
    EngineEvent, EventSender, TransferEngine, TransferHandle, TransferId, TransferRequest,
    TransferState,
};
use modelfetch::manager::{DownloadManager, ManagerBuilder, ManagerHandle};
use modelfetch::notify::{ChannelSink, Notification};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

// Common test constants
pub const TEST_URL: &str = "https://models.example.com/sd-v1-5.safetensors";
pub const TEST_FILE_NAME: &str = "sd-v1-5.safetensors";
pub const TEST_STAGING_SUFFIX: &str = ".download";

/// Installs a log subscriber honouring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that no file exists at the given path
pub fn assert_file_missing(path: &Path) {
    assert!(!path.exists(), "File should not exist at path: {:?}", path);
}

/// Creates a request for `url` saved as `file_name` under `dir`
pub fn create_test_request(url: &str, file_name: &str, dir: &Path) -> DownloadRequest {
    DownloadRequest::parse(url, file_name, dir, ModelType::StableDiffusion)
        .expect("Failed to create download request")
}

// === Mock engine ===

/// Counters shared between a mock transfer and its handle.
#[derive(Debug, Default)]
pub struct MockProgress {
    pub total: AtomicU64,
    pub received: AtomicU64,
    pub paused: AtomicBool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl MockProgress {
    pub fn set_received(&self, received: u64) {
        self.received.store(received, Ordering::SeqCst);
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MockHandle(pub Arc<MockProgress>);

impl MockHandle {
    pub fn new() -> (Self, Arc<MockProgress>) {
        let progress = Arc::new(MockProgress::default());
        (Self(Arc::clone(&progress)), progress)
    }
}

impl TransferHandle for MockHandle {
    fn state(&self) -> TransferState {
        TransferState::Progressing
    }

    fn total_bytes(&self) -> u64 {
        self.0.total.load(Ordering::SeqCst)
    }

    fn received_bytes(&self) -> u64 {
        self.0.received.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.0.paused.load(Ordering::SeqCst)
    }

    fn pause(&self) {
        self.0.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.0.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.0.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// A transfer the mock engine was asked to start.
#[derive(Debug, Clone)]
pub struct MockTransfer {
    pub request: TransferRequest,
    pub progress: Arc<MockProgress>,
    pub events: EventSender,
}

impl MockTransfer {
    pub fn id(&self) -> TransferId {
        self.request.id
    }

    /// Publishes `Started`, for engines built with [`MockEngine::manual`].
    pub fn start(&self) {
        self.events.send(EngineEvent::Started {
            transfer: self.id(),
            handle: Box::new(MockHandle(Arc::clone(&self.progress))),
        });
    }

    pub fn update(&self) {
        self.events.send(EngineEvent::Updated {
            transfer: self.id(),
            state: TransferState::Progressing,
        });
    }

    pub fn done(&self, state: TransferState) {
        self.events.send(EngineEvent::Done {
            transfer: self.id(),
            state,
        });
    }
}

/// Engine recording every request and, unless told otherwise, publishing
/// `Started` right away.
#[derive(Debug, Clone)]
pub struct MockEngine {
    transfers: Arc<Mutex<Vec<MockTransfer>>>,
    auto_start: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            transfers: Arc::new(Mutex::new(Vec::new())),
            auto_start: true,
        }
    }

    /// An engine that never publishes `Started` on its own.
    pub fn manual() -> Self {
        Self {
            auto_start: false,
            ..Self::new()
        }
    }

    pub fn transfers(&self) -> Vec<MockTransfer> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn transfer(&self, index: usize) -> MockTransfer {
        self.transfers.lock().unwrap()[index].clone()
    }

    pub fn started(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }
}

impl TransferEngine for MockEngine {
    fn start_download(&self, request: TransferRequest, events: EventSender) {
        let (handle, progress) = MockHandle::new();
        if self.auto_start {
            events.send(EngineEvent::Started {
                transfer: request.id,
                handle: Box::new(handle),
            });
        }
        self.transfers.lock().unwrap().push(MockTransfer {
            request,
            progress,
            events,
        });
    }
}

/// Creates a manager over `engine` whose notifications land in the returned receiver
pub fn create_test_manager(
    engine: &MockEngine,
) -> (
    DownloadManager,
    ManagerHandle,
    UnboundedReceiver<Notification>,
) {
    init_tracing();
    let (sink, notifications) = ChannelSink::new();
    let (manager, handle) = ManagerBuilder::new()
        .staging_suffix(TEST_STAGING_SUFFIX)
        .sink(sink)
        .build(Arc::new(engine.clone()));
    (manager, handle, notifications)
}

/// Takes every notification received so far
pub fn drain(notifications: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut drained = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        drained.push(notification);
    }
    drained
}

/// Names of the notifications, for order assertions
pub fn event_names(notifications: &[Notification]) -> Vec<&'static str> {
    notifications
        .iter()
        .map(|n| match n {
            Notification::AddDownload(_) => "addDownload",
            Notification::UpdateDownload(_) => "updateDownload",
            Notification::DeleteDownload(_) => "deleteDownload",
            Notification::FinalizeFailed { .. } => "finalizeFailed",
        })
        .collect()
}
