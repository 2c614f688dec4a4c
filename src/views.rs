//! Request handlers for the content endpoints.
//!
//! Views turn route parameters into resolver and cache calls and map the
//! outcome to a response. Failures become `{"error": "<message>"}` bodies with
//! the generic message from [`status_for`]; paths and parser output are only
//! logged.

use async_trait::async_trait;
use vitrine_cache::JsonCache;
use vitrine_core::{ContentError, ErrorKind, JsonRoot, status_for};
use vitrine_http::{Handler, Request, Response, Result};

/// Serves `{category}/{file}.json` from the route parameters of the same names.
#[derive(Debug, Clone)]
pub struct DocumentView {
	root: JsonRoot,
	cache: JsonCache,
}

impl DocumentView {
	pub fn new(root: JsonRoot, cache: JsonCache) -> Self {
		Self { root, cache }
	}
}

#[async_trait]
impl Handler for DocumentView {
	async fn handle(&self, request: Request) -> Result<Response> {
		let category = request.path_param("category").unwrap_or_default();
		let file = request.path_param("file").unwrap_or_default();

		let outcome = match self.root.resolve(category, file).await {
			Ok(path) => self.cache.get(&path).await,
			Err(err) => Err(err),
		};

		match outcome {
			Ok(document) => Response::ok().with_json(&*document),
			Err(err) => Ok(error_response(&err, err.kind())),
		}
	}
}

/// Serves one fixed document, such as `categories/pages`.
///
/// Unlike [`DocumentView`], a missing file is a server error here: the
/// document is part of the deployment and its absence is a fault.
#[derive(Debug, Clone)]
pub struct FixedDocumentView {
	root: JsonRoot,
	cache: JsonCache,
	name: String,
}

impl FixedDocumentView {
	/// `name` is relative to the JSON root, without the `.json` extension.
	pub fn new(root: JsonRoot, cache: JsonCache, name: impl Into<String>) -> Self {
		Self {
			root,
			cache,
			name: name.into(),
		}
	}
}

#[async_trait]
impl Handler for FixedDocumentView {
	async fn handle(&self, _request: Request) -> Result<Response> {
		let outcome = match self.root.resolve_relative(&self.name).await {
			Ok(path) => self.cache.get(&path).await,
			Err(err) => Err(err),
		};

		match outcome {
			Ok(document) => Response::ok().with_json(&*document),
			Err(err) => {
				let kind = match err.kind() {
					ErrorKind::PathTraversal => ErrorKind::PathTraversal,
					_ => ErrorKind::Io,
				};
				Ok(error_response(&err, kind))
			}
		}
	}
}

/// Liveness check. Touches neither the cache nor the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthView;

#[async_trait]
impl Handler for HealthView {
	async fn handle(&self, _request: Request) -> Result<Response> {
		Response::ok().with_json(&serde_json::json!({ "status": "ok" }))
	}
}

/// Logs `err` and builds the client response for `kind`.
fn error_response(err: &ContentError, kind: ErrorKind) -> Response {
	let (status, message) = status_for(kind);
	match err.kind() {
		ErrorKind::PathTraversal => tracing::warn!(error = %err, "rejected document path"),
		ErrorKind::NotFound => tracing::debug!(error = %err, "document not found"),
		_ => tracing::error!(error = %err, "failed to load document"),
	}
	Response::error(status, message)
}
