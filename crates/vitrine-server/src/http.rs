use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use vitrine_http::{Handler, Middleware, MiddlewareChain, Request, Response, StatusCode};

use crate::shutdown::ShutdownCoordinator;

/// Error type returned by the server entry points.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest request body accepted by default (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1 << 20;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of incoming connections.
#[async_trait]
pub(crate) trait Accept: Send {
	async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;

	fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Accept for TcpListener {
	async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
		TcpListener::accept(self).await
	}

	fn local_addr(&self) -> io::Result<SocketAddr> {
		TcpListener::local_addr(self)
	}
}

/// HTTP Server with middleware support
pub struct HttpServer {
	handler: Arc<dyn Handler>,
	middlewares: Vec<Arc<dyn Middleware>>,
	max_body_size: usize,
}

impl HttpServer {
	/// Create a new server with the given handler
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use vitrine_http::{Handler, Request, Response};
	/// use vitrine_server::HttpServer;
	///
	/// struct MyHandler;
	///
	/// #[async_trait::async_trait]
	/// impl Handler for MyHandler {
	///     async fn handle(&self, _req: Request) -> vitrine_http::Result<Response> {
	///         Ok(Response::ok().with_body("Hello"))
	///     }
	/// }
	///
	/// let server = HttpServer::new(Arc::new(MyHandler));
	/// assert_eq!(server.middleware_count(), 0);
	/// ```
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			middlewares: Vec::new(),
			max_body_size: DEFAULT_MAX_BODY_SIZE,
		}
	}

	/// Add a middleware to the server using builder pattern
	///
	/// Middlewares are executed in the order they are added.
	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	/// Sets the largest request body accepted, in bytes.
	///
	/// Larger bodies are answered with `413 {"error":"Payload too large"}`
	/// before the handler runs.
	pub fn with_max_body_size(mut self, limit: usize) -> Self {
		self.max_body_size = limit;
		self
	}

	/// Number of configured middleware.
	pub fn middleware_count(&self) -> usize {
		self.middlewares.len()
	}

	/// Returns the handler with every middleware applied.
	pub fn handler(&self) -> Arc<dyn Handler> {
		if self.middlewares.is_empty() {
			return self.handler.clone();
		}

		let mut chain = MiddlewareChain::new(self.handler.clone());
		for middleware in &self.middlewares {
			chain.add_middleware(middleware.clone());
		}
		Arc::new(chain)
	}

	/// Serves connections from an already bound listener.
	///
	/// Failed accepts are logged and retried after a short pause. On shutdown
	/// the listener stops accepting, open connections finish the request in
	/// progress and are closed, and connections still open after the
	/// coordinator's grace period are aborted.
	///
	/// # Errors
	///
	/// Currently always returns `Ok(())` once shutdown completes.
	pub async fn serve_listener(
		self,
		listener: TcpListener,
		coordinator: ShutdownCoordinator,
	) -> Result<(), BoxError> {
		self.serve_incoming(listener, coordinator).await
	}

	pub(crate) async fn serve_incoming<A: Accept>(
		self,
		mut listener: A,
		coordinator: ShutdownCoordinator,
	) -> Result<(), BoxError> {
		if let Ok(addr) = listener.local_addr() {
			tracing::info!(%addr, "server listening");
		}

		let handler = self.handler();
		let max_body_size = self.max_body_size;
		let mut shutdown_rx = coordinator.subscribe();
		let mut connections = JoinSet::new();

		if !coordinator.is_shutting_down() {
			loop {
				tokio::select! {
					result = listener.accept() => {
						let (stream, remote_addr) = match result {
							Ok(accepted) => accepted,
							Err(err) => {
								tracing::warn!(error = %err, "failed to accept connection");
								tokio::time::sleep(ACCEPT_BACKOFF).await;
								continue;
							}
						};
						let service = RequestService {
							handler: handler.clone(),
							remote_addr,
							max_body_size,
						};
						let conn_shutdown = coordinator.subscribe();
						connections.spawn(async move {
							if let Err(err) = Self::handle_connection(stream, service, conn_shutdown).await {
								tracing::error!(%remote_addr, error = %err, "error handling connection");
							}
						});
						// Reap finished connections so the set stays small.
						while connections.try_join_next().is_some() {}
					}
					_ = shutdown_rx.recv() => {
						tracing::info!("shutdown requested, no longer accepting connections");
						break;
					}
				}
			}
		}

		drop(listener);
		let drain = async { while connections.join_next().await.is_some() {} };
		if tokio::time::timeout(coordinator.timeout(), drain).await.is_err() {
			tracing::warn!(
				remaining = connections.len(),
				"grace period elapsed, aborting open connections"
			);
			connections.abort_all();
		}

		coordinator.notify_shutdown_complete();
		tracing::info!("server stopped");
		Ok(())
	}

	async fn handle_connection(
		stream: TcpStream,
		service: RequestService,
		mut shutdown: tokio::sync::broadcast::Receiver<()>,
	) -> Result<(), BoxError> {
		let io = TokioIo::new(stream);
		let connection = http1::Builder::new().serve_connection(io, service);
		tokio::pin!(connection);

		tokio::select! {
			result = connection.as_mut() => {
				result?;
				return Ok(());
			}
			_ = shutdown.recv() => {
				connection.as_mut().graceful_shutdown();
			}
		}

		connection.await?;
		Ok(())
	}
}

/// Service implementation for hyper
struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
	max_body_size: usize,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = BoxError;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;
		let max_body_size = self.max_body_size;

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			if declared_length(&parts.headers).is_some_and(|length| length > max_body_size as u64) {
				tracing::warn!(%remote_addr, path = parts.uri.path(), "declared request body too large");
				return Ok(payload_too_large());
			}
			let body = match Limited::new(body, max_body_size).collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(err) if err.is::<LengthLimitError>() => {
					tracing::warn!(%remote_addr, path = parts.uri.path(), "request body too large");
					return Ok(payload_too_large());
				}
				Err(err) => return Err(err),
			};

			let mut request = Request::new(parts.method, parts.uri, parts.version, parts.headers, body);
			request.remote_addr = Some(remote_addr);

			let response = handler.handle(request).await.unwrap_or_else(|err| {
				tracing::error!(%remote_addr, error = %err, "handler failed");
				Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
			});

			Ok(into_hyper(response))
		})
	}
}

fn declared_length(headers: &hyper::HeaderMap) -> Option<u64> {
	headers
		.get(hyper::header::CONTENT_LENGTH)?
		.to_str()
		.ok()?
		.parse()
		.ok()
}

fn payload_too_large() -> hyper::Response<Full<Bytes>> {
	into_hyper(Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"))
}

fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
	let mut hyper_response = hyper::Response::new(Full::new(response.body));
	*hyper_response.status_mut() = response.status;
	*hyper_response.headers_mut() = response.headers;
	hyper_response
}
