//! Remote asset retrieval for vidshop.
//!
//! This crate turns an item's stored reference into a file on local disk.
//!
//! # Overview
//!
//! - [`normalize_reference`] rewrites loosely formatted sharing links into one
//!   retrievable URL.
//! - [`output_filename`] derives the delivered filename from a hint.
//! - [`AssetFetcher`] is the seam the purchase flow depends on;
//!   [`HttpFetcher`] is the production implementation.
//!
//! Downloads land in a private temporary directory owned by the returned
//! [`FetchedAsset`]; dropping the asset removes the file.
//!
//! # Example
//!
//! ```no_run
//! use vidshop_fetch::{AssetFetcher, HttpFetcher, DEFAULT_FETCH_DEADLINE};
//!
//! # async fn example() -> vidshop_fetch::Result<()> {
//! let fetcher = HttpFetcher::new()?;
//! let asset = fetcher
//!     .fetch(
//!         "https://drive.google.com/file/d/1AbCdEfGhIjK/view",
//!         "intro",
//!         DEFAULT_FETCH_DEADLINE,
//!         25 * 1024 * 1024,
//!     )
//!     .await?;
//! println!("{} bytes at {}", asset.size_bytes(), asset.path().display());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod http;
pub mod normalize;

pub use error::{FetchError, Result};
pub use http::HttpFetcher;
pub use normalize::{normalize_reference, output_filename};

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

/// Deadline applied to a fetch when the caller does not choose one.
pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(120);

/// Retrieves remote assets into transient local storage.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `reference` to a local file named after `filename_hint`.
    ///
    /// The download runs on its own task and never blocks the caller's
    /// executor thread. It is abandoned once `deadline` elapses, or as soon
    /// as more than `max_bytes` have arrived.
    ///
    /// # Errors
    ///
    /// - `FetchError::Timeout` if the deadline elapses.
    /// - `FetchError::TooLarge` if the asset is bigger than `max_bytes`.
    /// - `FetchError::InvalidReference` if the reference cannot be normalized.
    /// - Any transport, status or I/O failure from the remote source.
    async fn fetch(
        &self,
        reference: &str,
        filename_hint: &str,
        deadline: Duration,
        max_bytes: u64,
    ) -> Result<FetchedAsset>;
}

/// A downloaded file and the temporary directory holding it.
#[derive(Debug)]
pub struct FetchedAsset {
    path: PathBuf,
    size_bytes: u64,
    content_type: Option<String>,
    _dir: TempDir,
}

impl FetchedAsset {
    /// Wrap a file that already lives inside `dir`.
    #[must_use]
    pub fn new(dir: TempDir, path: PathBuf, size_bytes: u64, content_type: Option<String>) -> Self {
        Self {
            path,
            size_bytes,
            content_type,
            _dir: dir,
        }
    }

    /// Write `bytes` to a fresh temporary directory.
    ///
    /// The filename is derived from `filename_hint` with [`output_filename`].
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Io` if the file cannot be written.
    pub async fn from_bytes(filename_hint: &str, bytes: &[u8]) -> Result<Self> {
        let dir = temp_dir()?;
        let path = dir.path().join(output_filename(filename_hint));

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(Self::new(dir, path, bytes.len() as u64, None))
    }

    /// Location of the downloaded file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's name, without directories.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(vidshop_core::DEFAULT_FILENAME)
    }

    /// Size of the file in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// `Content-Type` reported by the remote source, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// A deadline in whole seconds, rounding any fraction up.
#[must_use]
pub fn deadline_seconds(deadline: Duration) -> u64 {
    deadline.as_secs() + u64::from(deadline.subsec_nanos() > 0)
}

pub(crate) fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("vidshop-").tempdir()?)
}
