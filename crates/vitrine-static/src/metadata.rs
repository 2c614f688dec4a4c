//! File metadata used to build asset responses.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata for a static file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
	/// File size in bytes.
	pub size: u64,
	/// Last modification time.
	pub modified: SystemTime,
	/// Quoted entity tag derived from mtime and size.
	pub etag: String,
	/// MIME type guessed from the extension.
	pub mime_type: String,
	/// Absolute path to the file.
	pub path: PathBuf,
}

impl AssetMetadata {
	/// Reads metadata for `path`.
	///
	/// Returns `Ok(None)` when `path` exists but is not a regular file.
	///
	/// # Errors
	///
	/// Returns the underlying I/O error if the file cannot be inspected.
	pub async fn from_path(path: &Path) -> std::io::Result<Option<Self>> {
		let metadata = tokio::fs::metadata(path).await?;
		if !metadata.is_file() {
			return Ok(None);
		}

		let size = metadata.len();
		let modified = metadata.modified()?;
		let mime_type = mime_guess::from_path(path)
			.first_or_octet_stream()
			.to_string();

		Ok(Some(Self {
			size,
			modified,
			etag: entity_tag(modified, size),
			mime_type,
			path: path.to_path_buf(),
		}))
	}

	/// `Last-Modified` value in IMF-fixdate form.
	pub fn last_modified(&self) -> String {
		http_date(self.modified)
	}

	/// Returns true if an `If-None-Match` header value matches this file.
	///
	/// Accepts `*`, lists and weak tags.
	pub fn matches_etag(&self, if_none_match: &str) -> bool {
		if_none_match.split(',').map(str::trim).any(|candidate| {
			candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == self.etag
		})
	}
}

/// Builds a strong entity tag from modification time and size.
pub fn entity_tag(modified: SystemTime, size: u64) -> String {
	let mtime = modified
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or_default();
	format!("\"{:x}-{:x}\"", mtime, size)
}

/// Formats `time` as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: SystemTime) -> String {
	DateTime::<Utc>::from(time)
		.format("%a, %d %b %Y %H:%M:%S GMT")
		.to_string()
}
