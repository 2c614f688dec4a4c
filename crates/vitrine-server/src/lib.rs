//! HTTP server for Vitrine.
//!
//! A hyper HTTP/1.1 accept loop that hands every request to a
//! [`vitrine_http::Handler`], with graceful shutdown driven by a
//! [`ShutdownCoordinator`]. Request bodies larger than
//! [`DEFAULT_MAX_BODY_SIZE`] are rejected with `413`.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use vitrine_server::{HttpServer, ShutdownCoordinator, shutdown_signal};
//!
//! let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
//! let trigger = coordinator.clone();
//! tokio::spawn(async move {
//!     shutdown_signal().await;
//!     trigger.shutdown();
//! });
//!
//! let listener = tokio::net::TcpListener::bind(addr).await?;
//! HttpServer::new(handler)
//!     .serve_listener(listener, coordinator)
//!     .await?;
//! ```

pub mod http;
pub mod shutdown;

pub use http::{BoxError, DEFAULT_MAX_BODY_SIZE, HttpServer};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
