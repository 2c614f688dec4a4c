use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use vitrine_http::{Handler, Middleware, Request, Response, Result};

/// Emits one `tracing` event per request with method, path, status and
/// elapsed time.
///
/// Server errors are logged at `warn`, handler failures at `error`, and
/// everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Instant::now();
		let method = request.method.clone();
		let path = request.path().to_string();

		let result = next.handle(request).await;
		let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

		match &result {
			Ok(response) if response.status.is_server_error() => {
				tracing::warn!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request completed");
			}
			Ok(response) => {
				tracing::info!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request completed");
			}
			Err(err) => {
				tracing::error!(%method, %path, error = %err, elapsed_ms, "request failed");
			}
		}

		result
	}
}
