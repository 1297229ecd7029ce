//! Modelfetch manages downloads of model files into local model folders.
//!
//! Each download is fetched into a staging file next to its destination and
//! promoted with a rename once every byte arrived, so a model file on disk is
//! always complete. A single [`DownloadManager`] owns every session and
//! reports changes as [`Notification`]s.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modelfetch::{HttpEngine, HttpClientConfig, ManagerBuilder, ModelType, ProgressSink, StyleOptions};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), modelfetch::Error> {
//! let engine = Arc::new(HttpEngine::new(HttpClientConfig::default())?);
//! let (manager, handle) = ManagerBuilder::new()
//!     .sink(ProgressSink::new(StyleOptions::default()))
//!     .build(engine);
//! let running = tokio::spawn(manager.run());
//!
//! handle
//!     .submit_download(
//!         "https://host/4x-ultrasharp.pth",
//!         "4x-ultrasharp.pth",
//!         "models/upscalers",
//!         ModelType::Upscaler,
//!     )
//!     .await?;
//!
//! drop(handle);
//! let _ = running.await;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - requests, sessions, snapshots, speed sampling and finalization
//! - [`engine`] - the transfer engine contract and the HTTP engine
//! - [`manager`] - the `DownloadManager`, its registry, builder and handle
//! - [`notify`] - notifications and their sinks
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`http`] - HTTP client construction
//! - [`progress`] - Progress bar styling and a notification sink drawing bars

pub mod download;
pub mod engine;
pub mod error;
pub mod http;
pub mod manager;
pub mod notify;
pub mod progress;

pub use download::{DownloadRequest, DownloadState, ModelType, SessionId, Snapshot};
pub use engine::{EngineEvent, HttpEngine, TransferEngine, TransferHandle, TransferId};
pub use error::{Error, Result};
pub use http::{create_http_client, HttpClientConfig};
pub use manager::{DownloadManager, ManagerBuilder, ManagerHandle};
pub use notify::{ChannelSink, LogSink, Notification, NotificationSink};
pub use progress::{ProgressBarOpts, ProgressSink, StyleOptions};
