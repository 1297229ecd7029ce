//! Command interface of a running [`DownloadManager`](super::DownloadManager).
//!
//! The handle is what the host boundary holds on to. Every method queues a
//! command for the event loop and, where the command has an answer, waits
//! for it on a oneshot channel.

use crate::download::{DownloadRequest, ModelType, SessionId, Snapshot};
use crate::error::{Error, Result};

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// Commands understood by the event loop.
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        request: DownloadRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    Pause(SessionId),
    Resume(SessionId),
    Delete {
        id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    List {
        reply: oneshot::Sender<Vec<Snapshot>>,
    },
}

/// Cloneable sender of commands to the manager.
///
/// The event loop stops once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    commands: mpsc::Sender<Command>,
}

impl ManagerHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ManagerClosed)
    }

    async fn ask<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Result<T> {
        self.send(command).await?;
        reply.await.map_err(|_| Error::ManagerClosed)
    }

    /// Arms a download for `url` into `destination_dir/file_name`.
    ///
    /// Effects are observed through notifications. Submitting a URL that is
    /// already being downloaded is silently ignored.
    pub async fn submit_download(
        &self,
        url: &str,
        file_name: &str,
        destination_dir: impl Into<PathBuf>,
        model_type: ModelType,
    ) -> Result<()> {
        let request = DownloadRequest::parse(url, file_name, destination_dir, model_type)?;
        self.submit(request).await
    }

    /// Arms `request`.
    pub async fn submit(&self, request: DownloadRequest) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.ask(Command::Submit { request, reply }, rx).await?
    }

    /// Asks the transfer of session `id` to pause. Unknown ids are ignored.
    pub async fn pause_download(&self, id: SessionId) -> Result<()> {
        self.send(Command::Pause(id)).await
    }

    /// Asks the transfer of session `id` to resume. Unknown ids are ignored.
    pub async fn resume_download(&self, id: SessionId) -> Result<()> {
        self.send(Command::Resume(id)).await
    }

    /// Cancels the transfer if still running and forgets the session.
    ///
    /// Returns whether a session was removed.
    pub async fn delete_download(&self, id: SessionId) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.ask(Command::Delete { id, reply }, rx).await
    }

    /// Snapshots of every session.
    pub async fn get_downloads(&self) -> Result<Vec<Snapshot>> {
        let (reply, rx) = oneshot::channel();
        self.ask(Command::List { reply }, rx).await
    }
}
