//! HTTP client construction shared by the transfer engine.
//!
//! - [`client`] - client creation with retry and tracing middleware

pub mod client;

pub use client::{create_http_client, HttpClientConfig};
