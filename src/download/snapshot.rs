//! Plain-data views of sessions for the UI boundary.

use super::request::ModelType;
use super::session::{DownloadState, SessionId};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Sanitized, serializable copy of a session.
///
/// Mirrors the session minus its transfer handle. `path` is the destination
/// path, and `error` is only present once promoting the finished file failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SessionId,
    pub url: Url,
    pub file_name: String,
    pub path: PathBuf,
    pub state: DownloadState,
    pub speed_bytes_per_sec: u64,
    pub total_bytes: u64,
    pub received_bytes: u64,
    pub paused: bool,
    pub model_type: ModelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
