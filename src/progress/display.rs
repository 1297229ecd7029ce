//! Terminal rendering of download notifications.
//!
//! [`ProgressSink`] keeps one bar per session under a summary bar that counts
//! finished downloads.
//!
//! ```rust,no_run
//! use modelfetch::manager::ManagerBuilder;
//! use modelfetch::progress::{ProgressSink, StyleOptions};
//! # use modelfetch::engine::HttpEngine;
//! # use std::sync::Arc;
//!
//! # fn example() -> Result<(), modelfetch::Error> {
//! # let engine = Arc::new(HttpEngine::new(Default::default())?);
//! let (manager, handle) = ManagerBuilder::new()
//!     .sink(ProgressSink::new(StyleOptions::default()))
//!     .build(engine);
//! # Ok(())
//! # }
//! ```

use crate::download::{DownloadState, SessionId, Snapshot};
use crate::notify::{Notification, NotificationSink};
use crate::progress::StyleOptions;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::collections::HashMap;

/// Notification sink drawing progress bars.
#[derive(Debug)]
pub struct ProgressSink {
    multi: MultiProgress,
    summary: ProgressBar,
    bars: HashMap<SessionId, ProgressBar>,
    style_options: StyleOptions,
}

impl ProgressSink {
    pub fn new(style_options: StyleOptions) -> Self {
        let multi = match style_options.is_enabled() {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        let summary = multi.add(style_options.summary().to_progress_bar(0));
        Self {
            multi,
            summary,
            bars: HashMap::new(),
            style_options,
        }
    }

    /// Number of sessions currently drawn.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Position of the summary bar, i.e. finished downloads.
    pub fn finished(&self) -> u64 {
        self.summary.position()
    }

    fn add(&mut self, snapshot: &Snapshot) {
        let bar = self.multi.add(
            self.style_options
                .transfer()
                .to_progress_bar(snapshot.total_bytes)
                .with_position(snapshot.received_bytes)
                .with_message(snapshot.file_name.clone()),
        );
        self.summary.inc_length(1);
        self.bars.insert(snapshot.id, bar);
    }

    fn update(&mut self, snapshot: &Snapshot) {
        if !self.bars.contains_key(&snapshot.id) {
            self.add(snapshot);
        }
        let Some(bar) = self.bars.get(&snapshot.id) else {
            return;
        };
        if bar.is_finished() {
            return;
        }
        bar.set_length(snapshot.total_bytes);
        bar.set_position(snapshot.received_bytes);

        match snapshot.state {
            DownloadState::Paused => bar.set_message(format!("{} (paused)", snapshot.file_name)),
            DownloadState::Completed if snapshot.error.is_none() => {
                self.summary.inc(1);
                if self.style_options.transfer().clear {
                    bar.finish_and_clear();
                } else {
                    bar.finish_with_message(snapshot.file_name.clone());
                }
            }
            DownloadState::Completed | DownloadState::Cancelled | DownloadState::Interrupted => {
                self.summary.inc(1);
                bar.abandon_with_message(format!("{} ({:?})", snapshot.file_name, snapshot.state));
            }
            DownloadState::Pending | DownloadState::InProgress => {
                bar.set_message(snapshot.file_name.clone())
            }
        }
    }

    fn remove(&mut self, id: &SessionId) {
        if let Some(bar) = self.bars.remove(id) {
            if !bar.is_finished() {
                self.summary.inc(1);
            }
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

impl NotificationSink for ProgressSink {
    fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::AddDownload(snapshot) => self.add(&snapshot),
            Notification::UpdateDownload(snapshot) => self.update(&snapshot),
            Notification::DeleteDownload(id) => self.remove(&id),
            Notification::FinalizeFailed { id, message, .. } => {
                if let Some(bar) = self.bars.get(&id) {
                    bar.set_message(message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::ModelType;
    use crate::progress::ProgressBarOpts;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn hidden_sink() -> ProgressSink {
        ProgressSink::new(StyleOptions::new(
            ProgressBarOpts::hidden(),
            ProgressBarOpts::hidden(),
        ))
    }

    fn snapshot(state: DownloadState) -> Snapshot {
        Snapshot {
            id: Uuid::nil(),
            url: "https://host/model.bin".parse().unwrap(),
            file_name: "model.bin".into(),
            path: PathBuf::from("/models/model.bin"),
            state,
            speed_bytes_per_sec: 0,
            total_bytes: 100,
            received_bytes: 40,
            paused: false,
            model_type: ModelType::Lora,
            error: None,
        }
    }

    #[test]
    fn test_tracks_sessions() {
        let mut sink = hidden_sink();
        sink.notify(Notification::AddDownload(snapshot(DownloadState::Pending)));
        sink.notify(Notification::UpdateDownload(snapshot(DownloadState::InProgress)));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.finished(), 0);

        sink.notify(Notification::UpdateDownload(snapshot(DownloadState::Completed)));
        assert_eq!(sink.finished(), 1);

        sink.notify(Notification::DeleteDownload(Uuid::nil()));
        assert!(sink.is_empty());
        assert_eq!(sink.finished(), 1);
    }

    #[test]
    fn test_deleting_running_download_counts_as_finished() {
        let mut sink = hidden_sink();
        sink.notify(Notification::AddDownload(snapshot(DownloadState::Pending)));
        sink.notify(Notification::DeleteDownload(Uuid::nil()));
        assert_eq!(sink.finished(), 1);
    }
}
