//! Notifications pushed from the manager to the UI.
//!
//! The manager does not care how notifications travel; it hands every
//! [`Notification`] to a [`NotificationSink`]. Besides the sinks defined here,
//! any `FnMut(Notification) + Send` closure is a sink, and the
//! [`progress`](crate::progress) module renders them as terminal progress bars.
//!
//! # Example
//!
//! ```rust
//! use modelfetch::notify::{Notification, NotificationSink};
//!
//! let mut deleted = 0;
//! let mut sink = |n: Notification| {
//!     if let Notification::DeleteDownload(_) = n {
//!         deleted += 1;
//!     }
//! };
//! sink.notify(Notification::DeleteDownload(uuid::Uuid::nil()));
//! ```

use crate::download::{SessionId, Snapshot};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Message sent to the UI.
///
/// Serialized as `{ "event": "<name>", "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum Notification {
    /// A session was created.
    AddDownload(Snapshot),
    /// A session changed after an engine event.
    UpdateDownload(Snapshot),
    /// A session was removed.
    DeleteDownload(SessionId),
    /// A completed transfer could not be moved to its destination.
    FinalizeFailed {
        id: SessionId,
        path: PathBuf,
        message: String,
    },
}

/// Receiver of [`Notification`]s.
pub trait NotificationSink: Send {
    fn notify(&mut self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: FnMut(Notification) + Send,
{
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}

/// Forwards notifications into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl From<mpsc::UnboundedSender<Notification>> for ChannelSink {
    fn from(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&mut self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification receiver dropped");
        }
    }
}

/// Writes notifications to the tracing log. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::AddDownload(s) => {
                info!(id = %s.id, url = %s.url, file = %s.file_name, "download added")
            }
            Notification::UpdateDownload(s) if s.state.is_terminal() => {
                info!(id = %s.id, state = ?s.state, received = s.received_bytes, "download finished")
            }
            Notification::UpdateDownload(s) => debug!(
                id = %s.id,
                state = ?s.state,
                received = s.received_bytes,
                total = s.total_bytes,
                speed = s.speed_bytes_per_sec,
                "download updated"
            ),
            Notification::DeleteDownload(id) => info!(%id, "download deleted"),
            Notification::FinalizeFailed { id, path, message } => {
                error!(%id, ?path, %message, "download finished but could not be finalized")
            }
        }
    }
}
