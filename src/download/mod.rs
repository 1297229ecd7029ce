//! Download module containing the per-download building blocks.
//!
//! # Overview
//!
//! - [`request`] - what to fetch and where it lands
//! - [`session`] - the tracked state of one transfer and its state machine
//! - [`snapshot`] - the serializable view handed to the UI
//! - [`speed`] - windowed throughput estimation
//! - [`finalize`] - atomic promotion of the staged file
//!
//! # Examples
//!
//! ## Staging and destination paths
//!
//! ```rust
//! use modelfetch::download::{DownloadRequest, ModelType};
//! use std::path::PathBuf;
//!
//! let request = DownloadRequest::parse(
//!     "https://host/model.bin",
//!     "model.bin",
//!     "/models/lora",
//!     ModelType::Lora,
//! )?;
//! request.validate()?;
//! assert_eq!(request.destination_path(), PathBuf::from("/models/lora/model.bin"));
//! assert_eq!(
//!     request.staging_path(".download"),
//!     PathBuf::from("/models/lora/model.bin.download")
//! );
//! # Ok::<(), modelfetch::Error>(())
//! ```

pub mod finalize;
pub mod request;
pub mod session;
pub mod snapshot;
pub mod speed;

pub(crate) use request::ArmedRequest;

pub use finalize::finalize;
pub use request::{staging_path_for, DownloadRequest, ModelType};
pub use session::{DownloadSession, DownloadState, SessionId};
pub use snapshot::Snapshot;
pub use speed::{SpeedSampler, DEFAULT_SPEED_WINDOW};
