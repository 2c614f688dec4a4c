use async_trait::async_trait;
use hyper::Method;
use hyper::header::{
	ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
	ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue,
	VARY,
};
use std::sync::Arc;
use vitrine_http::{Handler, Middleware, Request, Response, Result};

/// CORS middleware configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
	pub allow_origins: Vec<String>,
	pub allow_methods: Vec<String>,
	/// Headers allowed in preflight answers. `None` echoes the requested headers.
	pub allow_headers: Option<Vec<String>>,
	pub allow_credentials: bool,
	pub max_age: Option<u64>,
}

impl Default for CorsConfig {
	fn default() -> Self {
		Self {
			allow_origins: vec!["*".to_string()],
			allow_methods: ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
				.into_iter()
				.map(String::from)
				.collect(),
			allow_headers: None,
			allow_credentials: false,
			max_age: None,
		}
	}
}

/// CORS middleware
///
/// Every `OPTIONS` request is treated as a preflight and answered with
/// `204 No Content` without reaching the handler.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
	config: CorsConfig,
}

impl CorsMiddleware {
	/// Create a new CORS middleware with custom configuration
	pub fn new(config: CorsConfig) -> Self {
		Self { config }
	}

	/// Any origin, the common methods, requested headers echoed.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use vitrine_http::{Handler, Middleware, Method, Request, Response};
	/// use vitrine_middleware::CorsMiddleware;
	///
	/// struct Ok200;
	///
	/// #[async_trait::async_trait]
	/// impl Handler for Ok200 {
	///     async fn handle(&self, _request: Request) -> vitrine_http::Result<Response> {
	///         Ok(Response::ok())
	///     }
	/// }
	///
	/// # tokio_test_block(async {
	/// let cors = CorsMiddleware::permissive();
	/// let request = Request::builder().method(Method::OPTIONS).uri("/api/a/b").build().unwrap();
	/// let response = cors.process(request, Arc::new(Ok200)).await.unwrap();
	/// assert_eq!(response.status, vitrine_http::StatusCode::NO_CONTENT);
	/// assert_eq!(response.headers["access-control-allow-origin"], "*");
	/// # });
	/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
	/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
	/// # }
	/// ```
	pub fn permissive() -> Self {
		Self::new(CorsConfig::default())
	}

	fn allow_origin(&self) -> HeaderValue {
		HeaderValue::from_str(&self.config.allow_origins.join(", "))
			.unwrap_or_else(|_| HeaderValue::from_static("*"))
	}

	fn preflight(&self, request: &Request) -> Response {
		let mut response = Response::no_content();

		response
			.headers
			.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin());

		if let Ok(methods) = HeaderValue::from_str(&self.config.allow_methods.join(",")) {
			response.headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods);
		}

		match &self.config.allow_headers {
			Some(headers) => {
				if let Ok(value) = HeaderValue::from_str(&headers.join(",")) {
					response.headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
				}
			}
			None => {
				if let Some(requested) = request.headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
					response
						.headers
						.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
					response.headers.append(
						VARY,
						HeaderValue::from_static("Access-Control-Request-Headers"),
					);
				}
			}
		}

		if let Some(max_age) = self.config.max_age {
			response
				.headers
				.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
		}

		if self.config.allow_credentials {
			response.headers.insert(
				ACCESS_CONTROL_ALLOW_CREDENTIALS,
				HeaderValue::from_static("true"),
			);
		}

		response
	}
}

impl Default for CorsMiddleware {
	fn default() -> Self {
		Self::permissive()
	}
}

#[async_trait]
impl Middleware for CorsMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		if request.method == Method::OPTIONS {
			return Ok(self.preflight(&request));
		}

		let mut response = next.handle(request).await?;

		response
			.headers
			.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin());

		if self.config.allow_credentials {
			response.headers.insert(
				ACCESS_CONTROL_ALLOW_CREDENTIALS,
				HeaderValue::from_static("true"),
			);
		}

		Ok(response)
	}
}
