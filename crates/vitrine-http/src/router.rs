//! Path pattern routing.
//!
//! Patterns use `{name}` for a single segment and `{name:*}` for the rest of
//! the path:
//!
//! - `/health` - exact match
//! - `/api/{category}/{file}` - two segment parameters
//! - `/assets/{path:*}` - wildcard, captures `a/b/c.png`
//!
//! Captured values are percent-decoded before they reach the handler. Decoded
//! values may contain `/` or `..`; callers that touch the filesystem must
//! validate them.

use async_trait::async_trait;
use hyper::Method;
use hyper::header::{ALLOW, HeaderValue};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::{Handler, Request, Response};

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	regex: regex::Regex,
	param_names: Vec<String>,
}

impl PathPattern {
	/// Compiles `pattern`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPattern`] for unclosed or empty parameters.
	///
	/// # Examples
	///
	/// ```
	/// use vitrine_http::PathPattern;
	///
	/// let pattern = PathPattern::new("/api/{category}/{file}").unwrap();
	/// let params = pattern.matches("/api/categories/pages").unwrap();
	/// assert_eq!(params["category"], "categories");
	/// assert_eq!(params["file"], "pages");
	/// assert!(pattern.matches("/api/categories").is_none());
	/// ```
	pub fn new(pattern: &str) -> Result<Self> {
		let (regex_str, param_names) = Self::compile(pattern)?;
		let regex = regex::Regex::new(&regex_str).map_err(|e| Error::InvalidPattern {
			pattern: pattern.to_string(),
			reason: e.to_string(),
		})?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			param_names,
		})
	}

	fn compile(pattern: &str) -> Result<(String, Vec<String>)> {
		let invalid = |reason: &str| Error::InvalidPattern {
			pattern: pattern.to_string(),
			reason: reason.to_string(),
		};

		let mut regex_str = String::from("^");
		let mut param_names = Vec::new();
		let mut chars = pattern.chars();

		while let Some(c) = chars.next() {
			if c != '{' {
				regex_str.push_str(&regex::escape(&c.to_string()));
				continue;
			}

			let mut param = String::new();
			let mut closed = false;
			for next in chars.by_ref() {
				if next == '}' {
					closed = true;
					break;
				}
				param.push(next);
			}
			if !closed {
				return Err(invalid("unclosed parameter"));
			}

			let (name, wildcard) = match param.strip_suffix(":*") {
				Some(name) => (name.to_string(), true),
				None => (param, false),
			};
			if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
				return Err(invalid("parameter names must be non-empty identifiers"));
			}

			if wildcard {
				regex_str.push_str(&format!("(?P<{}>.+)", name));
			} else {
				regex_str.push_str(&format!("(?P<{}>[^/]+)", name));
			}
			param_names.push(name);
		}

		regex_str.push('$');
		Ok((regex_str, param_names))
	}

	/// Returns the original pattern string.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Returns the parameter names in order of appearance.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Matches `path` and returns the percent-decoded parameters.
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let captures = self.regex.captures(path)?;
		Some(
			self.param_names
				.iter()
				.filter_map(|name| {
					captures.name(name).map(|m| {
						let decoded = percent_decode_str(m.as_str()).decode_utf8_lossy();
						(name.clone(), decoded.into_owned())
					})
				})
				.collect(),
		)
	}
}

struct Route {
	methods: Vec<Method>,
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
}

/// Dispatches requests to handlers by method and path.
///
/// Routes are tried in registration order, so a fixed route registered before
/// a parameterized one takes precedence.
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
}

impl Router {
	/// Creates an empty router.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for the given methods and pattern.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPattern`] if the pattern does not compile.
	pub fn route(mut self, methods: &[Method], pattern: &str, handler: Arc<dyn Handler>) -> Result<Self> {
		self.routes.push(Route {
			methods: methods.to_vec(),
			pattern: PathPattern::new(pattern)?,
			handler,
		});
		Ok(self)
	}

	/// Registers a `GET` route. `HEAD` requests are routed to the same handler.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPattern`] if the pattern does not compile.
	pub fn get(self, pattern: &str, handler: Arc<dyn Handler>) -> Result<Self> {
		self.route(&[Method::GET, Method::HEAD], pattern, handler)
	}

	/// Number of registered routes.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Returns true if no route is registered.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let mut allowed: Vec<&Method> = Vec::new();

		for route in &self.routes {
			let Some(params) = route.pattern.matches(request.path()) else {
				continue;
			};
			if !route.methods.contains(&request.method) {
				allowed.extend(route.methods.iter());
				continue;
			}

			tracing::trace!(pattern = route.pattern.pattern(), "route matched");
			request.path_params = params;
			return route.handler.handle(request).await;
		}

		if !allowed.is_empty() {
			allowed.dedup();
			let allow = allowed
				.iter()
				.map(|m| m.as_str())
				.collect::<Vec<_>>()
				.join(", ");
			let mut response = Response::error(hyper::StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
			if let Ok(value) = HeaderValue::from_str(&allow) {
				response.headers.insert(ALLOW, value);
			}
			return Ok(response);
		}

		Ok(Response::error(hyper::StatusCode::NOT_FOUND, "Not found"))
	}
}
