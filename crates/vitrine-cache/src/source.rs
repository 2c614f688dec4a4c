//! Byte sources for cache misses.

use async_trait::async_trait;
use std::path::Path;
use vitrine_core::{ContentError, Result};

/// Reads the raw bytes of a document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
	/// Reads the whole file at `path`.
	///
	/// # Errors
	///
	/// Returns [`ContentError::NotFound`] when the file does not exist and
	/// [`ContentError::Io`] for any other read failure.
	async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads documents from the local filesystem with `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

#[async_trait]
impl DocumentSource for FsSource {
	async fn read(&self, path: &Path) -> Result<Vec<u8>> {
		tokio::fs::read(path)
			.await
			.map_err(|source| ContentError::from_read(path.to_path_buf(), source))
	}
}
