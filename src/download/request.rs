//! Download requests.
//!
//! A [`DownloadRequest`] describes what to fetch and where the final file must
//! land. It only lives between submission and the moment the engine starts the
//! transfer; after that a [`DownloadSession`](super::DownloadSession) takes over.
//!
//! # Examples
//!
//! ```rust
//! use modelfetch::download::{DownloadRequest, ModelType};
//! use std::path::PathBuf;
//!
//! // The file name is taken from the last path segment.
//! let request = DownloadRequest::from_url(
//!     "https://host/models/v1-5%20pruned.safetensors",
//!     PathBuf::from("models/sd"),
//!     ModelType::StableDiffusion,
//! )?;
//! assert_eq!(request.file_name, "v1-5 pruned.safetensors");
//! # Ok::<(), modelfetch::Error>(())
//! ```

use crate::error::{Error, Result};

use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of model artifact being downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    StableDiffusion,
    Lora,
    Vae,
    Embedding,
    Upscaler,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelType::StableDiffusion => "stable-diffusion",
            ModelType::Lora => "lora",
            ModelType::Vae => "vae",
            ModelType::Embedding => "embedding",
            ModelType::Upscaler => "upscaler",
        };
        f.write_str(name)
    }
}

/// A file to fetch into a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// URL of the file to download.
    pub url: Url,
    /// Name of the final file inside `destination_dir`.
    pub file_name: String,
    /// Directory receiving the file.
    pub destination_dir: PathBuf,
    /// Kind of model, reported back in snapshots.
    pub model_type: ModelType,
}

impl DownloadRequest {
    /// Creates a new [`DownloadRequest`].
    pub fn new(
        url: &Url,
        file_name: &str,
        destination_dir: impl Into<PathBuf>,
        model_type: ModelType,
    ) -> Self {
        Self {
            url: url.clone(),
            file_name: String::from(file_name),
            destination_dir: destination_dir.into(),
            model_type,
        }
    }

    /// Parses `url` and creates a request for it.
    pub fn parse(
        url: &str,
        file_name: &str,
        destination_dir: impl Into<PathBuf>,
        model_type: ModelType,
    ) -> Result<Self> {
        let url = parse_url(url)?;
        Ok(Self::new(&url, file_name, destination_dir, model_type))
    }

    /// Creates a request whose file name is the decoded last path segment of `url`.
    pub fn from_url(
        url: &str,
        destination_dir: impl Into<PathBuf>,
        model_type: ModelType,
    ) -> Result<Self> {
        let url = parse_url(url)?;
        let file_name = url
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a valid path", url))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", url))
            })?;
        Ok(Self::new(&url, &file_name, destination_dir, model_type))
    }

    /// Checks that the request can be fetched and stays inside its directory.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "The url \"{}\" is not an HTTP(S) url",
                self.url
            )));
        }
        let name = self.file_name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || Path::new(name).is_absolute()
        {
            return Err(Error::InvalidFileName(self.file_name.clone()));
        }
        Ok(())
    }

    /// Final location of the file.
    pub fn destination_path(&self) -> PathBuf {
        self.destination_dir.join(&self.file_name)
    }

    /// Location the bytes are written to until the transfer completes.
    pub fn staging_path(&self, suffix: &str) -> PathBuf {
        staging_path_for(&self.destination_path(), suffix)
    }
}

/// Appends `suffix` to the file name of `destination`.
pub fn staging_path_for(destination: &Path, suffix: &str) -> PathBuf {
    let mut staged = OsString::from(destination.as_os_str());
    staged.push(suffix);
    PathBuf::from(staged)
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url)
        .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", url, e)))
}

/// A validated request waiting for the engine to start its transfer.
#[derive(Debug, Clone)]
pub(crate) struct ArmedRequest {
    pub(crate) request: DownloadRequest,
    pub(crate) destination_path: PathBuf,
    pub(crate) staging_path: PathBuf,
}

impl ArmedRequest {
    pub(crate) fn new(request: DownloadRequest, staging_suffix: &str) -> Self {
        Self {
            destination_path: request.destination_path(),
            staging_path: request.staging_path(staging_suffix),
            request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(file_name: &str) -> DownloadRequest {
        DownloadRequest::parse("https://host/model.bin", file_name, "/models", ModelType::Lora)
            .unwrap()
    }

    #[test]
    fn test_from_url_decodes_file_name() {
        let r = DownloadRequest::from_url(
            "https://host/files/my%20model.ckpt?download=true",
            "/models",
            ModelType::StableDiffusion,
        )
        .unwrap();
        assert_eq!(r.file_name, "my model.ckpt");
    }

    #[test]
    fn test_from_url_keeps_plus_and_equals() {
        let r = DownloadRequest::from_url(
            "https://host/files/a+b=c%2Bd.safetensors",
            "/models",
            ModelType::Lora,
        )
        .unwrap();
        assert_eq!(r.file_name, "a+b=c+d.safetensors");
    }

    #[test]
    fn test_from_url_without_file_name() {
        let r = DownloadRequest::from_url("https://host/", "/models", ModelType::Vae);
        assert!(matches!(r, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let r = DownloadRequest::parse("not a url", "a.bin", "/models", ModelType::Vae);
        assert!(matches!(r, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_rejects_escaping_names() {
        for name in ["", ".", "..", "../a.bin", "sub/a.bin", "sub\\a.bin"] {
            assert!(
                matches!(request(name).validate(), Err(Error::InvalidFileName(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(request("a.bin").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let r = DownloadRequest::parse("ftp://host/a.bin", "a.bin", "/models", ModelType::Lora)
            .unwrap();
        assert!(matches!(r.validate(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_staging_path_appends_suffix() {
        let r = request("model.bin");
        assert_eq!(r.destination_path(), PathBuf::from("/models/model.bin"));
        assert_eq!(
            r.staging_path(".download"),
            PathBuf::from("/models/model.bin.download")
        );
    }
}
