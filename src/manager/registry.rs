//! In-memory collection of download sessions.
//!
//! Sessions stay here after they finish; only an explicit delete removes
//! them. The expected cardinality is a handful of downloads started by a
//! person, so lookups are linear scans that keep insertion order.

use crate::download::{DownloadSession, DownloadState, SessionId, Snapshot};
use crate::engine::TransferId;

use std::path::Path;
use tracing::debug;
use url::Url;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<DownloadSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, session: DownloadSession) {
        self.sessions.push(session);
    }

    pub fn find_by_id(&self, id: &SessionId) -> Option<&DownloadSession> {
        self.sessions.iter().find(|s| s.id() == *id)
    }

    pub fn find_by_transfer_mut(&mut self, transfer: TransferId) -> Option<&mut DownloadSession> {
        self.sessions.iter_mut().find(|s| s.transfer() == transfer)
    }

    /// Removes a session, aborting its transfer first unless it completed.
    pub fn remove_by_id(&mut self, id: &SessionId) -> Option<DownloadSession> {
        let index = self.sessions.iter().position(|s| s.id() == *id)?;
        let session = &self.sessions[index];
        if session.state() != DownloadState::Completed {
            debug!(%id, state = ?session.state(), "cancelling transfer before removal");
            session.cancel();
        }
        Some(self.sessions.remove(index))
    }

    /// Snapshots of every session, in insertion order.
    pub fn list_all(&self) -> Vec<Snapshot> {
        self.sessions.iter().map(DownloadSession::snapshot).collect()
    }

    /// Whether a non-terminal session already fetches `url`.
    pub fn has_active_url(&self, url: &Url) -> bool {
        self.sessions
            .iter()
            .any(|s| s.is_active() && s.url() == url)
    }

    /// Whether a non-terminal session writes to, or will promote into, `path`.
    pub fn has_active_path(&self, path: &Path) -> bool {
        self.sessions.iter().any(|s| {
            s.is_active() && (s.destination_path() == path || s.staging_path() == path)
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
