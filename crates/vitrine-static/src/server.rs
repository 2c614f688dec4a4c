//! Asset request handling.

use async_trait::async_trait;
use hyper::header::{
	CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderValue, IF_NONE_MATCH, LAST_MODIFIED,
};
use hyper::{Method, StatusCode};
use std::path::Path;
use std::time::Duration;
use vitrine_core::RootDir;
use vitrine_http::{Handler, Request, Response};

use crate::metadata::AssetMetadata;

/// Serves files below an asset root.
///
/// As a [`Handler`] it reads the file name from the `path` route parameter,
/// so it is mounted on a wildcard route such as `/assets/{path:*}`.
#[derive(Debug, Clone)]
pub struct AssetServer {
	root: RootDir,
	max_age: Duration,
}

impl AssetServer {
	/// Route parameter holding the relative file path.
	pub const PATH_PARAM: &'static str = "path";

	pub fn new(root: RootDir, max_age: Duration) -> Self {
		Self { root, max_age }
	}

	/// Asset root directory.
	pub fn root(&self) -> &Path {
		self.root.path()
	}

	/// `Cache-Control` value sent with every served file.
	pub fn cache_control(&self) -> String {
		format!("public, max-age={}", self.max_age.as_secs())
	}

	/// Serves `relative` for `request`.
	///
	/// Missing files, directories, dotfiles and paths outside the root all
	/// answer 404. `HEAD` gets the headers without reading the file.
	pub async fn serve(&self, relative: &str, request: &Request) -> Response {
		if is_hidden(relative) {
			tracing::debug!(requested = relative, "hidden asset path rejected");
			return not_found();
		}

		let path = match self.root.join(Path::new(relative)).await {
			Ok(path) => path,
			Err(err) => {
				tracing::debug!(requested = relative, error = %err, "asset path rejected");
				return not_found();
			}
		};

		let metadata = match AssetMetadata::from_path(&path).await {
			Ok(Some(metadata)) => metadata,
			Ok(None) => return not_found(),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return not_found(),
			Err(err) => {
				tracing::error!(path = %path.display(), error = %err, "failed to stat asset");
				return server_error();
			}
		};

		if let Some(if_none_match) = request.header(IF_NONE_MATCH.as_str())
			&& metadata.matches_etag(if_none_match)
		{
			return self.with_validators(Response::not_modified(), &metadata);
		}

		let response = self
			.with_validators(Response::ok(), &metadata)
			.with_header(CONTENT_TYPE.as_str(), &metadata.mime_type)
			.with_header(CONTENT_LENGTH.as_str(), &metadata.size.to_string());

		if request.method == Method::HEAD {
			return response;
		}

		match tokio::fs::read(&metadata.path).await {
			Ok(bytes) => response
				.with_header(CONTENT_LENGTH.as_str(), &bytes.len().to_string())
				.with_body(bytes),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => not_found(),
			Err(err) => {
				tracing::error!(path = %metadata.path.display(), error = %err, "failed to read asset");
				server_error()
			}
		}
	}

	fn with_validators(&self, response: Response, metadata: &AssetMetadata) -> Response {
		let mut response = response
			.with_header(ETAG.as_str(), &metadata.etag)
			.with_header(LAST_MODIFIED.as_str(), &metadata.last_modified());
		if let Ok(value) = HeaderValue::from_str(&self.cache_control()) {
			response.headers.insert(CACHE_CONTROL, value);
		}
		response
	}
}

#[async_trait]
impl Handler for AssetServer {
	async fn handle(&self, request: Request) -> vitrine_http::Result<Response> {
		let relative = request.path_param(Self::PATH_PARAM).unwrap_or_default();
		Ok(self.serve(relative, &request).await)
	}
}

/// True if any segment of `relative` starts with a dot.
fn is_hidden(relative: &str) -> bool {
	relative
		.split(['/', '\\'])
		.any(|segment| segment.starts_with('.'))
}

fn not_found() -> Response {
	Response::error(StatusCode::NOT_FOUND, "Not found")
}

fn server_error() -> Response {
	Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("logo.png", false)]
	#[case("icons/logo.v2.png", false)]
	#[case(".env", true)]
	#[case(".git/config", true)]
	#[case("icons/.hidden/logo.png", true)]
	#[case("../secret.png", true)]
	fn test_is_hidden(#[case] relative: &str, #[case] hidden: bool) {
		assert_eq!(is_hidden(relative), hidden);
	}
}
