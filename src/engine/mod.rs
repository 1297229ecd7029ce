//! Transfer engine contract.
//!
//! The engine performs the actual network fetch. The manager only talks to it
//! through [`TransferEngine::start_download`] and the [`TransferHandle`] it gets
//! back inside an [`EngineEvent::Started`]; everything else the engine reports
//! is published as typed [`EngineEvent`]s on a single-consumer queue.
//!
//! - [`http`] - the reqwest-backed engine used in production

pub mod http;

pub use http::HttpEngine;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Correlation id generated when a request is armed.
///
/// The engine echoes it on every event it publishes for that transfer, which is
/// how a started transfer is matched back to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// State of a transfer as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferState {
    /// Bytes are flowing, or the transfer is paused.
    Progressing,
    /// All bytes were written to the save path.
    Completed,
    /// The transfer was aborted through its handle.
    Cancelled,
    /// The transfer stopped on a network or disk error.
    Interrupted,
}

impl TransferState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            TransferState::Progressing => 0,
            TransferState::Completed => 1,
            TransferState::Cancelled => 2,
            TransferState::Interrupted => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => TransferState::Progressing,
            1 => TransferState::Completed,
            2 => TransferState::Cancelled,
            _ => TransferState::Interrupted,
        }
    }
}

/// What the manager asks the engine to fetch.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Correlation id to echo on every event.
    pub id: TransferId,
    /// Remote location.
    pub url: Url,
    /// Where the bytes must be written. This is always the staging path.
    pub save_path: PathBuf,
}

/// Live view on, and control over, one engine transfer.
///
/// Pause, resume and cancel are requests: their effect is observed through the
/// next [`EngineEvent`] for the transfer.
pub trait TransferHandle: Send + Sync + fmt::Debug {
    fn state(&self) -> TransferState;
    fn total_bytes(&self) -> u64;
    fn received_bytes(&self) -> u64;
    fn is_paused(&self) -> bool;
    fn pause(&self);
    fn resume(&self);
    fn cancel(&self);
}

/// Something able to fetch a URL into a file.
pub trait TransferEngine: Send + Sync {
    /// Begin fetching `request.url` into `request.save_path`.
    ///
    /// The engine must publish [`EngineEvent::Started`] with a handle for the
    /// transfer, then any number of [`EngineEvent::Updated`] and exactly one
    /// [`EngineEvent::Done`]. A transfer that fails before a handle exists may
    /// publish `Done` alone.
    fn start_download(&self, request: TransferRequest, events: EventSender);
}

/// Events published by a [`TransferEngine`].
#[derive(Debug)]
pub enum EngineEvent {
    /// The engine began a transfer and hands over its handle.
    Started {
        transfer: TransferId,
        handle: Box<dyn TransferHandle>,
    },
    /// Progress or pause state changed.
    Updated {
        transfer: TransferId,
        state: TransferState,
    },
    /// The transfer reached its final state.
    Done {
        transfer: TransferId,
        state: TransferState,
    },
}

impl EngineEvent {
    /// Correlation id the event refers to.
    pub fn transfer(&self) -> TransferId {
        match self {
            EngineEvent::Started { transfer, .. }
            | EngineEvent::Updated { transfer, .. }
            | EngineEvent::Done { transfer, .. } => *transfer,
        }
    }
}

/// Sending half of the engine event queue.
///
/// Sending never blocks; events published after the manager stopped are
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    pub fn send(&self, event: EngineEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!(transfer = %err.0.transfer(), "manager gone, dropping engine event");
        }
    }
}

/// Create the engine event queue.
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
