//! Core manager implementation.
//!
//! [`DownloadManager`] owns the session registry and the armed requests and is
//! the only place where they change. Commands and engine events are handled
//! one at a time, either by [`DownloadManager::run`] or by calling the methods
//! directly, so no locking is involved.
//!
//! # Examples
//!
//! ```rust,no_run
//! use modelfetch::download::ModelType;
//! use modelfetch::engine::HttpEngine;
//! use modelfetch::http::HttpClientConfig;
//! use modelfetch::manager::ManagerBuilder;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), modelfetch::Error> {
//! let engine = Arc::new(HttpEngine::new(HttpClientConfig::default())?);
//! let (manager, handle) = ManagerBuilder::new().build(engine);
//! tokio::spawn(manager.run());
//!
//! handle
//!     .submit_download(
//!         "https://host/sd-v1-5.safetensors",
//!         "sd-v1-5.safetensors",
//!         "models/stable-diffusion",
//!         ModelType::StableDiffusion,
//!     )
//!     .await?;
//! for download in handle.get_downloads().await? {
//!     println!("{} {:?}", download.file_name, download.state);
//! }
//! # Ok(())
//! # }
//! ```

use super::config::ManagerConfig;
use super::handle::{Command, ManagerHandle};
use super::registry::SessionRegistry;
use crate::download::{
    finalize, ArmedRequest, DownloadRequest, DownloadSession, DownloadState, SessionId, Snapshot,
};
use crate::engine::{
    event_channel, EngineEvent, EventSender, TransferEngine, TransferHandle, TransferId,
    TransferRequest, TransferState,
};
use crate::error::{Error, Result};
use crate::notify::Notification;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Owner of every download session.
pub struct DownloadManager {
    config: ManagerConfig,
    engine: Arc<dyn TransferEngine>,
    registry: SessionRegistry,
    armed: HashMap<TransferId, ArmedRequest>,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    commands_rx: mpsc::Receiver<Command>,
}

impl fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("armed", &self.armed.len())
            .finish()
    }
}

impl DownloadManager {
    pub(crate) fn new(
        config: ManagerConfig,
        engine: Arc<dyn TransferEngine>,
    ) -> (Self, ManagerHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity);
        let (events_tx, events_rx) = event_channel();
        let manager = Self {
            config,
            engine,
            registry: SessionRegistry::new(),
            armed: HashMap::new(),
            events_tx,
            events_rx,
            commands_rx,
        };
        (manager, ManagerHandle::new(commands_tx))
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Gets the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Number of requests waiting for their transfer to start.
    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    /// Runs the event loop until every [`ManagerHandle`] is dropped.
    ///
    /// Dropping the manager drops the sessions and their transfer handles.
    pub async fn run(mut self) {
        info!("download manager started");
        loop {
            tokio::select! {
                biased;

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }

                command = self.commands_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }
        info!(sessions = self.registry.len(), "download manager stopped");
    }

    /// Handles every engine event already queued, returning how many there were.
    pub async fn process_pending_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            processed += 1;
        }
        processed
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { request, reply } => {
                let url = request.url.clone();
                let result = self.submit(request).await.map(|_| ());
                if let Err(e) = &result {
                    warn!(%url, error = %e, "download request rejected");
                }
                let _ = reply.send(result);
            }
            Command::Pause(id) => {
                self.pause(&id);
            }
            Command::Resume(id) => {
                self.resume(&id);
            }
            Command::Delete { id, reply } => {
                let _ = reply.send(self.delete(&id));
            }
            Command::List { reply } => {
                let _ = reply.send(self.downloads());
            }
        }
    }

    /// Validates `request`, cleans stale files and asks the engine to fetch it.
    ///
    /// Returns `Ok(None)` without doing anything when the URL is already
    /// being downloaded or waiting for its transfer to start. A different URL
    /// whose destination or staging file belongs to an active download is
    /// rejected with [`Error::PathInUse`] before anything is deleted.
    pub async fn submit(&mut self, request: DownloadRequest) -> Result<Option<TransferId>> {
        request.validate()?;
        if self.is_url_active(&request.url) {
            debug!(url = %request.url, "download already in progress, ignoring request");
            return Ok(None);
        }

        let armed = ArmedRequest::new(request, &self.config.staging_suffix);
        if let Some(path) = self.path_in_use(&armed) {
            return Err(Error::PathInUse(path));
        }
        fs::create_dir_all(&armed.request.destination_dir).await?;
        remove_stale(&armed.destination_path).await?;
        remove_stale(&armed.staging_path).await?;

        let transfer = TransferId::new();
        let transfer_request = TransferRequest {
            id: transfer,
            url: armed.request.url.clone(),
            save_path: armed.staging_path.clone(),
        };
        info!(%transfer, url = %armed.request.url, "arming download");
        self.armed.insert(transfer, armed);
        self.engine.start_download(transfer_request, self.events_tx.clone());
        Ok(Some(transfer))
    }

    fn is_url_active(&self, url: &Url) -> bool {
        self.registry.has_active_url(url) || self.armed.values().any(|a| a.request.url == *url)
    }

    /// First path of `armed` that an active session or another armed request owns.
    fn path_in_use(&self, armed: &ArmedRequest) -> Option<PathBuf> {
        [&armed.destination_path, &armed.staging_path]
            .into_iter()
            .find(|path| {
                self.registry.has_active_path(path)
                    || self
                        .armed
                        .values()
                        .any(|a| a.destination_path == **path || a.staging_path == **path)
            })
            .cloned()
    }

    /// Forwards a pause request to the transfer. Returns whether the session exists.
    pub fn pause(&self, id: &SessionId) -> bool {
        match self.registry.find_by_id(id) {
            Some(session) => {
                debug!(%id, "pausing download");
                session.pause();
                true
            }
            None => false,
        }
    }

    /// Forwards a resume request to the transfer. Returns whether the session exists.
    pub fn resume(&self, id: &SessionId) -> bool {
        match self.registry.find_by_id(id) {
            Some(session) => {
                debug!(%id, "resuming download");
                session.resume();
                true
            }
            None => false,
        }
    }

    /// Cancels the transfer if it did not complete and forgets the session.
    pub fn delete(&mut self, id: &SessionId) -> bool {
        match self.registry.remove_by_id(id) {
            Some(session) => {
                info!(%id, state = ?session.state(), "download deleted");
                self.config.sink.notify(Notification::DeleteDownload(*id));
                true
            }
            None => false,
        }
    }

    /// Snapshots of every session.
    pub fn downloads(&self) -> Vec<Snapshot> {
        self.registry.list_all()
    }

    /// Applies one engine event.
    pub async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Started { transfer, handle } => self.on_started(transfer, handle),
            EngineEvent::Updated { transfer, state } => self.on_updated(transfer, state),
            EngineEvent::Done { transfer, state } => self.on_done(transfer, state).await,
        }
    }

    fn on_started(&mut self, transfer: TransferId, handle: Box<dyn TransferHandle>) {
        let Some(armed) = self.armed.remove(&transfer) else {
            warn!(error = %Error::UnboundTransfer(transfer), "aborting untracked transfer");
            handle.cancel();
            return;
        };

        let session = DownloadSession::new(
            transfer,
            armed,
            handle,
            Instant::now(),
            self.config.speed_window,
        );
        info!(id = %session.id(), url = %session.url(), "download started");
        let snapshot = session.snapshot();
        self.registry.add(session);
        self.config.sink.notify(Notification::AddDownload(snapshot));
    }

    fn on_updated(&mut self, transfer: TransferId, state: TransferState) {
        let Some(session) = self.registry.find_by_transfer_mut(transfer) else {
            debug!(%transfer, "update for unknown transfer ignored");
            return;
        };
        if !session.is_active() {
            debug!(id = %session.id(), "update after completion ignored");
            return;
        }
        session.apply_update(state, Instant::now());
        self.config
            .sink
            .notify(Notification::UpdateDownload(session.snapshot()));
    }

    async fn on_done(&mut self, transfer: TransferId, state: TransferState) {
        let Some(session) = self.registry.find_by_transfer_mut(transfer) else {
            match self.armed.remove(&transfer) {
                Some(armed) => {
                    warn!(url = %armed.request.url, ?state, "transfer ended before it started")
                }
                None => debug!(%transfer, "done for unknown transfer ignored"),
            }
            return;
        };
        if !session.is_active() {
            debug!(id = %session.id(), "repeated done event ignored");
            return;
        }

        session.apply_done(state);
        if session.state() == DownloadState::Completed {
            let staging = session.staging_path().to_path_buf();
            let destination = session.destination_path().to_path_buf();
            let finalized = finalize(&staging, &destination).await;
            if let Err(e) = finalized {
                let message = match std::error::Error::source(&e) {
                    Some(source) => format!("{e}: {source}"),
                    None => e.to_string(),
                };
                error!(id = %session.id(), %message, "could not finalize download");
                session.set_finalize_error(message.clone());
                self.config.sink.notify(Notification::FinalizeFailed {
                    id: session.id(),
                    path: destination,
                    message,
                });
            } else {
                info!(id = %session.id(), path = ?destination, "download completed");
            }
        } else {
            info!(
                id = %session.id(),
                state = ?session.state(),
                staging = ?session.staging_path(),
                "download ended without completing"
            );
        }
        self.config
            .sink
            .notify(Notification::UpdateDownload(session.snapshot()));
    }
}

/// Deletes a leftover of a previous attempt, if any.
async fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale file {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
