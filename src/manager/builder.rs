//! Builder pattern implementation for creating [`DownloadManager`] instances.
//!
//! # Examples
//!
//! ```rust
//! use modelfetch::engine::HttpEngine;
//! use modelfetch::http::HttpClientConfig;
//! use modelfetch::manager::ManagerBuilder;
//! use modelfetch::notify::ChannelSink;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), modelfetch::Error> {
//! let (sink, _notifications) = ChannelSink::new();
//! let engine = Arc::new(HttpEngine::new(HttpClientConfig::default())?);
//! let (manager, handle) = ManagerBuilder::new()
//!     .staging_suffix(".part")
//!     .sink(sink)
//!     .build(engine);
//! # let _ = (manager, handle);
//! # Ok(())
//! # }
//! ```

use super::config::ManagerConfig;
use super::handle::ManagerHandle;
use super::manager::DownloadManager;
use crate::engine::TransferEngine;
use crate::notify::NotificationSink;

use std::sync::Arc;
use std::time::Duration;

/// A builder used to create a [`DownloadManager`] and its [`ManagerHandle`].
#[derive(Debug, Default)]
pub struct ManagerBuilder {
    config: ManagerConfig,
}

impl ManagerBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        ManagerBuilder::default()
    }

    /// Sets the suffix of staging files.
    ///
    /// An empty suffix is ignored: the staging file would be the destination.
    pub fn staging_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        if !suffix.is_empty() {
            self.config.staging_suffix = suffix;
        }
        self
    }

    /// Sets the minimum time between two throughput computations.
    pub fn speed_window(mut self, window: Duration) -> Self {
        self.config.speed_window = window;
        self
    }

    /// Sets the capacity of the command queue.
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity.max(1);
        self
    }

    /// Sets the receiver of session notifications.
    pub fn sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.config.sink = Box::new(sink);
        self
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Create the [`DownloadManager`] driving `engine`.
    pub fn build(self, engine: Arc<dyn TransferEngine>) -> (DownloadManager, ManagerHandle) {
        DownloadManager::new(self.config, engine)
    }
}
