//! Security header middleware.
//!
//! Adds a fixed set of hardening headers to every response:
//! - Content-Security-Policy
//! - Strict-Transport-Security
//! - X-Frame-Options, X-Content-Type-Options and related legacy headers
//! - Referrer-Policy
//! - Cross-Origin-Opener-Policy and Cross-Origin-Resource-Policy
//!
//! Headers already set by the handler are left untouched.

use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use vitrine_http::{Handler, Middleware, Request, Response, Result};

const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
	form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
	script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
	upgrade-insecure-requests";

/// Security header configuration. `None` disables a header.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
	pub content_security_policy: Option<String>,
	/// HSTS max-age in seconds (default: 31536000 = 1 year)
	pub hsts_seconds: Option<u64>,
	pub hsts_include_subdomains: bool,
	pub frame_options: Option<String>,
	pub referrer_policy: Option<String>,
	pub cross_origin_opener_policy: Option<String>,
	pub cross_origin_resource_policy: Option<String>,
}

impl Default for SecurityConfig {
	fn default() -> Self {
		Self {
			content_security_policy: Some(DEFAULT_CSP.to_string()),
			hsts_seconds: Some(31_536_000),
			hsts_include_subdomains: true,
			frame_options: Some("SAMEORIGIN".to_string()),
			referrer_policy: Some("no-referrer".to_string()),
			cross_origin_opener_policy: Some("same-origin".to_string()),
			cross_origin_resource_policy: Some("same-origin".to_string()),
		}
	}
}

/// Adds security headers to responses.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware {
	headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeadersMiddleware {
	/// Create a middleware with the default header set
	pub fn new() -> Self {
		Self::with_config(SecurityConfig::default())
	}

	/// Create a middleware from `config`. Values that are not valid header
	/// values are skipped.
	pub fn with_config(config: SecurityConfig) -> Self {
		let mut headers = Vec::new();
		let mut push = |name: &'static str, value: Option<String>| {
			if let Some(value) = value
				&& let Ok(value) = HeaderValue::from_str(&value)
			{
				headers.push((HeaderName::from_static(name), value));
			}
		};

		push("content-security-policy", config.content_security_policy);
		push(
			"cross-origin-opener-policy",
			config.cross_origin_opener_policy,
		);
		push(
			"cross-origin-resource-policy",
			config.cross_origin_resource_policy,
		);
		push("origin-agent-cluster", Some("?1".to_string()));
		push("referrer-policy", config.referrer_policy);
		push(
			"strict-transport-security",
			config.hsts_seconds.map(|seconds| {
				if config.hsts_include_subdomains {
					format!("max-age={}; includeSubDomains", seconds)
				} else {
					format!("max-age={}", seconds)
				}
			}),
		);
		push("x-content-type-options", Some("nosniff".to_string()));
		push("x-dns-prefetch-control", Some("off".to_string()));
		push("x-download-options", Some("noopen".to_string()));
		push("x-frame-options", config.frame_options);
		push("x-permitted-cross-domain-policies", Some("none".to_string()));
		push("x-xss-protection", Some("0".to_string()));

		Self { headers }
	}

	/// Headers this middleware adds.
	pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
		&self.headers
	}

	fn apply(&self, response: &mut Response) {
		for (name, value) in &self.headers {
			response
				.headers
				.entry(name.clone())
				.or_insert_with(|| value.clone());
		}
	}
}

impl Default for SecurityHeadersMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for SecurityHeadersMiddleware {
	async fn process(&self, request: Request, handler: Arc<dyn Handler>) -> Result<Response> {
		let mut response = handler.handle(request).await?;
		self.apply(&mut response);
		Ok(response)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::StatusCode;
	use rstest::rstest;

	struct TestHandler;

	#[async_trait]
	impl Handler for TestHandler {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::new(StatusCode::OK)
				.with_body("content")
				.with_header("X-Frame-Options", "DENY"))
		}
	}

	async fn respond(middleware: SecurityHeadersMiddleware) -> Response {
		let request = Request::builder().uri("/health").build().unwrap();
		middleware
			.process(request, Arc::new(TestHandler))
			.await
			.unwrap()
	}

	#[rstest]
	#[case("x-content-type-options", "nosniff")]
	#[case("referrer-policy", "no-referrer")]
	#[case("strict-transport-security", "max-age=31536000; includeSubDomains")]
	#[case("cross-origin-opener-policy", "same-origin")]
	#[case("cross-origin-resource-policy", "same-origin")]
	#[case("x-dns-prefetch-control", "off")]
	#[case("x-download-options", "noopen")]
	#[case("x-permitted-cross-domain-policies", "none")]
	#[case("origin-agent-cluster", "?1")]
	#[case("x-xss-protection", "0")]
	#[tokio::test]
	async fn test_default_headers(#[case] name: &str, #[case] expected: &str) {
		let response = respond(SecurityHeadersMiddleware::new()).await;
		assert_eq!(response.headers[name], expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_default_csp() {
		let response = respond(SecurityHeadersMiddleware::new()).await;
		let csp = response.headers["content-security-policy"].to_str().unwrap();
		assert!(csp.starts_with("default-src 'self';"));
		assert!(csp.contains("object-src 'none'"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_handler_header_is_kept() {
		let response = respond(SecurityHeadersMiddleware::new()).await;
		assert_eq!(response.headers["x-frame-options"], "DENY");
	}

	#[rstest]
	#[tokio::test]
	async fn test_disabled_headers_are_omitted() {
		let config = SecurityConfig {
			content_security_policy: None,
			hsts_seconds: None,
			..SecurityConfig::default()
		};
		let response = respond(SecurityHeadersMiddleware::with_config(config)).await;

		assert!(!response.headers.contains_key("content-security-policy"));
		assert!(!response.headers.contains_key("strict-transport-security"));
		assert!(response.headers.contains_key("referrer-policy"));
	}

	#[rstest]
	fn test_hsts_without_subdomains() {
		let config = SecurityConfig {
			hsts_include_subdomains: false,
			..SecurityConfig::default()
		};
		let middleware = SecurityHeadersMiddleware::with_config(config);
		let hsts = middleware
			.headers()
			.iter()
			.find(|(name, _)| name == "strict-transport-security")
			.map(|(_, value)| value.clone())
			.unwrap();
		assert_eq!(hsts, "max-age=31536000");
	}
}
