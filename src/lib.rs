//! # Vitrine
//!
//! A read-only JSON content server with a self-invalidating document cache.
//!
//! Documents live on disk as `{json_root}/{category}/{file}.json` and are
//! served from `/api/{category}/{file}`. Parsed documents are cached in memory
//! and evicted as soon as the filesystem reports a change, so the next request
//! re-reads the file. Static files are served from `/assets/`.
//!
//! ## Crates
//!
//! - [`core`] - errors, path containment and settings (`vitrine-core`)
//! - [`http`] - request, response, middleware and routing (`vitrine-http`)
//! - [`cache`] - the document cache and its invalidation (`vitrine-cache`)
//! - [`assets`] - static asset serving (`vitrine-static`)
//! - [`middleware`] - CORS, security headers and logging (`vitrine-middleware`)
//! - [`server`] - the hyper server loop (`vitrine-server`)
//!
//! ## Running
//!
//! ```rust,no_run
//! use vitrine::{App, Settings, ShutdownCoordinator};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let listener = tokio::net::TcpListener::bind(settings.listen_addr()).await?;
//! let app = App::new(settings)?;
//! app.serve(listener, ShutdownCoordinator::new(Duration::from_secs(30))).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod logging;
pub mod views;

pub use vitrine_cache as cache;
pub use vitrine_core as core;
pub use vitrine_http as http;
pub use vitrine_middleware as middleware;
pub use vitrine_server as server;
pub use vitrine_static as assets;

pub use app::{App, AppError};
pub use vitrine_cache::JsonCache;
pub use vitrine_core::{ContentError, JsonRoot, Settings};
pub use vitrine_server::ShutdownCoordinator;
pub use views::{DocumentView, FixedDocumentView, HealthView};
