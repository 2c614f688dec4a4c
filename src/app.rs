//! Application wiring.
//!
//! [`App::new`] opens the configured directories, creates the cache, starts the
//! filesystem watcher and its invalidator task, and assembles the routes:
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /api/categories/pages` | [`FixedDocumentView`] |
//! | `GET /api/{category}/{file}` | [`DocumentView`] |
//! | `GET /assets/{path:*}` | [`AssetServer`] |
//! | `GET /health` | [`HealthView`] |
//!
//! Every route also answers `HEAD`. Responses pass through request logging,
//! CORS and security header middleware.

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use vitrine_cache::{ChangeWatcher, Invalidator, JsonCache};
use vitrine_core::{ContentError, JsonRoot, RootDir, Settings};
use vitrine_http::{Handler, Router};
use vitrine_middleware::{CorsMiddleware, LoggingMiddleware, SecurityHeadersMiddleware};
use vitrine_server::{BoxError, HttpServer, ShutdownCoordinator};
use vitrine_static::AssetServer;

use crate::views::{DocumentView, FixedDocumentView, HealthView};

/// Relative name of the document behind `/api/categories/pages`.
pub const PAGES_DOCUMENT: &str = "categories/pages";

/// Errors raised while starting the application.
#[derive(Debug, Error)]
pub enum AppError {
	#[error(transparent)]
	Content(#[from] ContentError),

	#[error("failed to build routes: {0}")]
	Routing(#[from] vitrine_http::Error),

	#[error("server error: {0}")]
	Server(BoxError),
}

/// A running application: cache, watcher and routes.
///
/// Dropping the value stops the watcher, which closes the event channel and
/// ends the invalidator task.
pub struct App {
	settings: Settings,
	json_root: JsonRoot,
	cache: JsonCache,
	router: Arc<Router>,
	watcher: ChangeWatcher,
	invalidator: JoinHandle<()>,
}

impl App {
	/// Bootstraps the application. Must be called inside a Tokio runtime.
	///
	/// # Errors
	///
	/// - [`ContentError::RootUnavailable`] if the JSON root does not exist
	/// - [`ContentError::WatchSetup`] if the JSON root cannot be watched
	pub fn new(settings: Settings) -> Result<Self, AppError> {
		let json_root = JsonRoot::open(&settings.json_root)?;
		let cache = JsonCache::new();

		let (watcher, events) = ChangeWatcher::new(&json_root)?;
		let invalidator = Invalidator::new(cache.clone(), json_root.clone()).spawn(events);

		let assets = match RootDir::open(&settings.assets_dir) {
			Ok(dir) => Some(AssetServer::new(dir, settings.asset_max_age)),
			Err(err) => {
				tracing::warn!(error = %err, "assets directory unavailable, /assets/ will answer 404");
				None
			}
		};

		let router = Arc::new(build_router(&json_root, &cache, assets)?);

		tracing::debug!(
			json_root = %json_root.path().display(),
			watching = %watcher.root().display(),
			"application ready"
		);

		Ok(Self {
			settings,
			json_root,
			cache,
			router,
			watcher,
			invalidator,
		})
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// The canonical JSON root.
	pub fn json_root(&self) -> &JsonRoot {
		&self.json_root
	}

	/// The shared document cache.
	pub fn cache(&self) -> &JsonCache {
		&self.cache
	}

	/// The HTTP server with the middleware stack applied.
	pub fn server(&self) -> HttpServer {
		HttpServer::new(self.router.clone())
			.with_middleware(Arc::new(LoggingMiddleware::new()))
			.with_middleware(Arc::new(CorsMiddleware::permissive()))
			.with_middleware(Arc::new(SecurityHeadersMiddleware::new()))
	}

	/// The full request handler, middleware included.
	pub fn handler(&self) -> Arc<dyn Handler> {
		self.server().handler()
	}

	/// Serves `listener` until `coordinator` requests shutdown.
	///
	/// # Errors
	///
	/// Returns [`AppError::Server`] if accepting connections fails.
	pub async fn serve(self, listener: TcpListener, coordinator: ShutdownCoordinator) -> Result<(), AppError> {
		let result = self
			.server()
			.serve_listener(listener, coordinator)
			.await
			.map_err(AppError::Server);

		drop(self.watcher);
		if let Err(err) = self.invalidator.await {
			tracing::warn!(error = %err, "invalidator task ended abnormally");
		}
		result
	}
}

fn build_router(json_root: &JsonRoot, cache: &JsonCache, assets: Option<AssetServer>) -> Result<Router, AppError> {
	let mut router = Router::new()
		.get(
			"/api/categories/pages",
			Arc::new(FixedDocumentView::new(
				json_root.clone(),
				cache.clone(),
				PAGES_DOCUMENT,
			)),
		)?
		.get(
			"/api/{category}/{file}",
			Arc::new(DocumentView::new(json_root.clone(), cache.clone())),
		)?
		.get("/health", Arc::new(HealthView))?;

	if let Some(assets) = assets {
		router = router.get(
			&format!("/assets/{{{}:*}}", AssetServer::PATH_PARAM),
			Arc::new(assets),
		)?;
	}

	Ok(router)
}
