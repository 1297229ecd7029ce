//! Manager module: the event loop owning every download session.
//!
//! # Overview
//!
//! - `manager` - [`DownloadManager`], request gateway and event handling
//! - `registry` - [`SessionRegistry`], the in-memory session list
//! - `handle` - [`ManagerHandle`], the command interface of a running manager
//! - `builder` - [`ManagerBuilder`]
//! - `config` - [`ManagerConfig`] and its defaults

pub mod builder;
pub mod config;
pub mod handle;
#[allow(clippy::module_inception)]
pub mod manager;
pub mod registry;

pub use builder::ManagerBuilder;
pub use config::ManagerConfig;
pub use handle::ManagerHandle;
pub use manager::DownloadManager;
pub use registry::SessionRegistry;
