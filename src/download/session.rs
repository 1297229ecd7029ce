//! Download sessions and their state machine.
//!
//! ```text
//! Pending -> InProgress <-> Paused -> Completed | Cancelled | Interrupted
//! ```
//!
//! A session is created when the engine hands back a transfer for an armed
//! request and is only ever mutated by engine events and user commands. It
//! owns the transfer handle; nothing else can reach it.

use super::request::{ArmedRequest, ModelType};
use super::snapshot::Snapshot;
use super::speed::SpeedSampler;
use crate::engine::{TransferHandle, TransferId, TransferState};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// Identifier of a session, generated at creation and never reused.
pub type SessionId = Uuid;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadState {
    /// The engine started the transfer but reported no progress yet.
    Pending,
    InProgress,
    Paused,
    Completed,
    Cancelled,
    Interrupted,
}

impl DownloadState {
    /// Whether the session reached its final state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadState::Completed | DownloadState::Cancelled | DownloadState::Interrupted
        )
    }

    fn from_final(state: TransferState) -> Self {
        match state {
            TransferState::Completed => DownloadState::Completed,
            TransferState::Cancelled => DownloadState::Cancelled,
            // A transfer that ends while still progressing did not finish.
            TransferState::Interrupted | TransferState::Progressing => DownloadState::Interrupted,
        }
    }
}

/// Tracked state of one download.
#[derive(Debug)]
pub struct DownloadSession {
    id: SessionId,
    transfer: TransferId,
    url: Url,
    file_name: String,
    destination_path: PathBuf,
    staging_path: PathBuf,
    state: DownloadState,
    total_bytes: u64,
    received_bytes: u64,
    paused: bool,
    model_type: ModelType,
    sampler: SpeedSampler,
    finalize_error: Option<String>,
    handle: Box<dyn TransferHandle>,
}

impl DownloadSession {
    pub(crate) fn new(
        transfer: TransferId,
        armed: ArmedRequest,
        handle: Box<dyn TransferHandle>,
        now: Instant,
        speed_window: Duration,
    ) -> Self {
        let received_bytes = handle.received_bytes();
        Self {
            id: Uuid::new_v4(),
            transfer,
            url: armed.request.url,
            file_name: armed.request.file_name,
            destination_path: armed.destination_path,
            staging_path: armed.staging_path,
            state: DownloadState::Pending,
            total_bytes: handle.total_bytes(),
            received_bytes,
            paused: handle.is_paused(),
            model_type: armed.request.model_type,
            sampler: SpeedSampler::new(received_bytes, now, speed_window),
            finalize_error: None,
            handle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transfer(&self) -> TransferId {
        self.transfer
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn speed(&self) -> u64 {
        self.sampler.speed()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Message of the failed promotion, if the file could not be finalized.
    pub fn finalize_error(&self) -> Option<&str> {
        self.finalize_error.as_deref()
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Refreshes progress from the handle after an `updated` event.
    pub(crate) fn apply_update(&mut self, reported: TransferState, now: Instant) {
        if reported != TransferState::Progressing {
            warn!(
                id = %self.id,
                ?reported,
                "ignoring final state outside of a done event"
            );
        }

        self.total_bytes = self.handle.total_bytes();
        let received = self.handle.received_bytes();
        if received < self.received_bytes {
            warn!(
                id = %self.id,
                received,
                previous = self.received_bytes,
                "engine reported fewer received bytes, keeping previous value"
            );
        } else {
            self.received_bytes = received;
        }
        self.paused = self.handle.is_paused();
        self.state = if self.paused {
            DownloadState::Paused
        } else {
            DownloadState::InProgress
        };
        self.sampler.sample(self.received_bytes, now);
    }

    /// Records the final state reported by a `done` event.
    pub(crate) fn apply_done(&mut self, reported: TransferState) {
        self.total_bytes = self.handle.total_bytes();
        self.received_bytes = self.handle.received_bytes();
        self.paused = self.handle.is_paused();
        self.state = DownloadState::from_final(reported);
    }

    pub(crate) fn set_finalize_error(&mut self, message: String) {
        self.finalize_error = Some(message);
    }

    pub(crate) fn pause(&self) {
        self.handle.pause();
    }

    pub(crate) fn resume(&self) {
        self.handle.resume();
    }

    pub(crate) fn cancel(&self) {
        self.handle.cancel();
    }

    /// Plain-data copy of the session, without the transfer handle.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id,
            url: self.url.clone(),
            file_name: self.file_name.clone(),
            path: self.destination_path.clone(),
            state: self.state,
            speed_bytes_per_sec: self.sampler.speed(),
            total_bytes: self.total_bytes,
            received_bytes: self.received_bytes,
            paused: self.paused,
            model_type: self.model_type,
            error: self.finalize_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::request::DownloadRequest;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counters {
        total: AtomicU64,
        received: AtomicU64,
        paused: AtomicBool,
    }

    #[derive(Debug)]
    struct FakeHandle(Arc<Counters>);

    impl TransferHandle for FakeHandle {
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
        fn pause(&self) {}
        fn resume(&self) {}
        fn cancel(&self) {}
    }

    fn session(now: Instant) -> (DownloadSession, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let request = DownloadRequest::parse(
            "https://host/model.bin",
            "model.bin",
            "/models",
            ModelType::StableDiffusion,
        )
        .unwrap();
        let session = DownloadSession::new(
            TransferId::new(),
            ArmedRequest::new(request, ".download"),
            Box::new(FakeHandle(Arc::clone(&counters))),
            now,
            Duration::from_millis(1000),
        );
        (session, counters)
    }

    #[test]
    fn test_new_session_is_pending() {
        let (session, _) = session(Instant::now());
        assert_eq!(session.state(), DownloadState::Pending);
        assert!(session.is_active());
        assert_eq!(
            session.staging_path(),
            Path::new("/models/model.bin.download")
        );
    }

    #[test]
    fn test_update_follows_pause_flag() {
        let now = Instant::now();
        let (mut session, counters) = session(now);
        counters.received.store(10, Ordering::SeqCst);
        session.apply_update(TransferState::Progressing, now);
        assert_eq!(session.state(), DownloadState::InProgress);

        counters.paused.store(true, Ordering::SeqCst);
        session.apply_update(TransferState::Progressing, now);
        assert_eq!(session.state(), DownloadState::Paused);
        assert!(session.snapshot().paused);
    }

    #[test]
    fn test_received_bytes_never_decrease() {
        let now = Instant::now();
        let (mut session, counters) = session(now);
        counters.received.store(500, Ordering::SeqCst);
        session.apply_update(TransferState::Progressing, now);
        counters.received.store(200, Ordering::SeqCst);
        session.apply_update(TransferState::Progressing, now);
        assert_eq!(session.received_bytes(), 500);
    }

    #[test]
    fn test_update_cannot_terminate() {
        let now = Instant::now();
        let (mut session, _) = session(now);
        session.apply_update(TransferState::Completed, now);
        assert_eq!(session.state(), DownloadState::InProgress);
    }

    #[test]
    fn test_done_while_progressing_is_interrupted() {
        let (mut session, _) = session(Instant::now());
        session.apply_done(TransferState::Progressing);
        assert_eq!(session.state(), DownloadState::Interrupted);
        assert!(!session.is_active());
    }

    #[test]
    fn test_snapshot_exposes_finalize_error() {
        let (mut session, _) = session(Instant::now());
        session.apply_done(TransferState::Completed);
        session.set_finalize_error("permission denied".into());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, DownloadState::Completed);
        assert_eq!(snapshot.error.as_deref(), Some("permission denied"));
        assert_eq!(snapshot.path, PathBuf::from("/models/model.bin"));
    }
}
