//! Error types for content lookups.
//!
//! Every failure that can happen between "a request names a document" and
//! "the document is parsed" is a [`ContentError`]. Handlers never inspect the
//! error text; they call [`ContentError::kind`] and translate the kind with
//! [`status_for`], so no filesystem detail reaches a client.

use http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for content operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Content lookup and startup errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
	/// The requested path escapes its root directory.
	#[error("path escapes the configured root: {requested}")]
	PathTraversal {
		/// The relative path as requested.
		requested: String,
	},

	/// The backing file does not exist.
	#[error("file not found: {}", path.display())]
	NotFound {
		/// Absolute path that was looked up.
		path: PathBuf,
	},

	/// The backing file exists but could not be read.
	#[error("failed to read {}: {source}", path.display())]
	Io {
		/// Absolute path that was read.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// The backing file is not valid JSON.
	#[error("failed to parse {}: {source}", path.display())]
	Parse {
		/// Absolute path that was parsed.
		path: PathBuf,
		/// Underlying parser error.
		#[source]
		source: serde_json::Error,
	},

	/// The filesystem watch subscription could not be established.
	#[error("failed to watch {}: {reason}", path.display())]
	WatchSetup {
		/// Directory that should have been watched.
		path: PathBuf,
		/// Backend-specific reason.
		reason: String,
	},

	/// A configured root directory cannot be canonicalized.
	#[error("root directory {} is unavailable: {source}", path.display())]
	RootUnavailable {
		/// Directory as configured.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},
}

/// Coarse classification of a [`ContentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	PathTraversal,
	NotFound,
	Io,
	Parse,
	WatchSetup,
	RootUnavailable,
}

impl ContentError {
	/// Returns the kind of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::PathTraversal { .. } => ErrorKind::PathTraversal,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::Io { .. } => ErrorKind::Io,
			Self::Parse { .. } => ErrorKind::Parse,
			Self::WatchSetup { .. } => ErrorKind::WatchSetup,
			Self::RootUnavailable { .. } => ErrorKind::RootUnavailable,
		}
	}

	/// Builds the error for a failed read, distinguishing a missing file.
	pub fn from_read(path: PathBuf, source: std::io::Error) -> Self {
		if source.kind() == std::io::ErrorKind::NotFound {
			Self::NotFound { path }
		} else {
			Self::Io { path, source }
		}
	}
}

/// Maps an error kind to the HTTP status and the generic message sent to clients.
///
/// This is the only place where internal failures are translated for the
/// outside world.
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use vitrine_core::{ErrorKind, status_for};
///
/// assert_eq!(status_for(ErrorKind::NotFound), (StatusCode::NOT_FOUND, "File not found"));
/// assert_eq!(status_for(ErrorKind::PathTraversal), (StatusCode::BAD_REQUEST, "Invalid path"));
/// ```
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
	match kind {
		ErrorKind::PathTraversal => (StatusCode::BAD_REQUEST, "Invalid path"),
		ErrorKind::NotFound => (StatusCode::NOT_FOUND, "File not found"),
		ErrorKind::Io | ErrorKind::Parse | ErrorKind::WatchSetup | ErrorKind::RootUnavailable => {
			(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
		}
	}
}
