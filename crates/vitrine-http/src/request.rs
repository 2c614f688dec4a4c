use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::{Error, Result};

/// HTTP request as seen by handlers.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Peer address, when the request came from a socket.
	pub remote_addr: Option<SocketAddr>,
	/// Percent-decoded parameters captured by the router.
	pub path_params: HashMap<String, String>,
}

impl Request {
	/// Creates a request from its parts.
	///
	/// # Examples
	///
	/// ```
	/// use bytes::Bytes;
	/// use hyper::{HeaderMap, Method, Uri, Version};
	/// use vitrine_http::Request;
	///
	/// let request = Request::new(
	///     Method::GET,
	///     Uri::from_static("/health"),
	///     Version::HTTP_11,
	///     HeaderMap::new(),
	///     Bytes::new(),
	/// );
	/// assert_eq!(request.path(), "/health");
	/// ```
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		Self {
			method,
			uri,
			version,
			headers,
			body,
			remote_addr: None,
			path_params: HashMap::new(),
		}
	}

	/// Starts building a request.
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Returns the URI path.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Returns a path parameter captured by the router.
	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	/// Returns a header value as a string, if present and valid.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}

/// Builder for [`Request`], mostly used by tests.
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			remote_addr: None,
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Adds a single header; invalid names or values are ignored.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	/// Builds the request.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidRequest`] if the URI cannot be parsed.
	pub fn build(self) -> Result<Request> {
		let uri = self
			.uri
			.parse::<Uri>()
			.map_err(|e| Error::InvalidRequest(e.to_string()))?;
		let mut request = Request::new(self.method, uri, self.version, self.headers, self.body);
		request.remote_addr = self.remote_addr;
		Ok(request)
	}
}
