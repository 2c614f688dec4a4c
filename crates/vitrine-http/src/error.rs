//! Errors produced by the HTTP layer itself.

use thiserror::Error;

/// Result type for handlers and middleware.
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP layer errors.
///
/// Content lookup failures are translated into responses by the views and
/// never travel through this type.
#[derive(Debug, Error)]
pub enum Error {
	/// A request could not be built from its parts.
	#[error("invalid request: {0}")]
	InvalidRequest(String),

	/// A route pattern failed to compile.
	#[error("invalid route pattern '{pattern}': {reason}")]
	InvalidPattern {
		/// Pattern as registered.
		pattern: String,
		/// Compilation failure.
		reason: String,
	},

	/// A response body could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(String),

	/// Any other failure while producing a response.
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}
