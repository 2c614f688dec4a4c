use bytes::Bytes;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

/// HTTP Response representation
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Create a Response with HTTP 200 OK status
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 204 No Content status
	pub fn no_content() -> Self {
		Self::new(StatusCode::NO_CONTENT)
	}

	/// Create a Response with HTTP 304 Not Modified status
	pub fn not_modified() -> Self {
		Self::new(StatusCode::NOT_MODIFIED)
	}

	/// Builds a JSON error response of the form `{"error": message}`.
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::error(StatusCode::NOT_FOUND, "File not found");
	/// assert_eq!(response.status, StatusCode::NOT_FOUND);
	/// assert_eq!(&response.body[..], br#"{"error":"File not found"}"#);
	/// ```
	pub fn error(status: StatusCode, message: &str) -> Self {
		let body = serde_json::json!({ "error": message });
		match Self::new(status).with_json(&body) {
			Ok(response) => response,
			Err(_) => Self::new(status).with_body(message.to_string()),
		}
	}

	/// Set the response body
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::Response;
	/// use bytes::Bytes;
	///
	/// let response = Response::ok().with_body("Hello, World!");
	/// assert_eq!(response.body, Bytes::from("Hello, World!"));
	/// ```
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a custom header to the response
	///
	/// Invalid names or values are ignored.
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::Response;
	///
	/// let response = Response::ok().with_header("X-Custom-Header", "custom-value");
	/// assert_eq!(
	///     response.headers.get("X-Custom-Header").unwrap().to_str().unwrap(),
	///     "custom-value"
	/// );
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Set the response body to JSON and add the Content-Type header
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::Response;
	/// use serde_json::json;
	///
	/// let response = Response::ok().with_json(&json!({"status": "ok"})).unwrap();
	/// assert_eq!(
	///     response.headers.get("content-type").unwrap().to_str().unwrap(),
	///     "application/json; charset=utf-8"
	/// );
	/// assert_eq!(&response.body[..], br#"{"status":"ok"}"#);
	/// ```
	pub fn with_json<T: Serialize + ?Sized>(mut self, data: &T) -> crate::Result<Self> {
		let json = serde_json::to_vec(data)?;
		self.body = Bytes::from(json);
		self.headers.insert(
			header::CONTENT_TYPE,
			HeaderValue::from_static("application/json; charset=utf-8"),
		);
		Ok(self)
	}
}
