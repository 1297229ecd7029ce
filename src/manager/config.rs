//! Configuration structures and defaults for the manager.

use crate::download::DEFAULT_SPEED_WINDOW;
use crate::notify::{LogSink, NotificationSink};

use std::fmt;
use std::time::Duration;

/// Configuration structure for the manager.
pub struct ManagerConfig {
    /// Suffix appended to the destination path while bytes are being written.
    pub staging_suffix: String,
    /// Minimum time between two throughput computations of a session.
    pub speed_window: Duration,
    /// Capacity of the command queue feeding the event loop.
    pub command_capacity: usize,
    /// Receiver of session notifications.
    pub sink: Box<dyn NotificationSink>,
}

impl ManagerConfig {
    /// Default staging suffix.
    pub const DEFAULT_STAGING_SUFFIX: &'static str = ".download";
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("staging_suffix", &self.staging_suffix)
            .field("speed_window", &self.speed_window)
            .field("command_capacity", &self.command_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            staging_suffix: Self::DEFAULT_STAGING_SUFFIX.to_string(),
            speed_window: DEFAULT_SPEED_WINDOW,
            command_capacity: 64,
            sink: Box::new(LogSink),
        }
    }
}
