//! # Vitrine Middleware
//!
//! Cross-cutting response processing applied to every route:
//!
//! - [`CorsMiddleware`] - permissive CORS headers and preflight answers
//! - [`SecurityHeadersMiddleware`] - hardening headers on every response
//! - [`LoggingMiddleware`] - one `tracing` event per request

pub mod cors;
pub mod logging;
pub mod security;

pub use cors::{CorsConfig, CorsMiddleware};
pub use logging::LoggingMiddleware;
pub use security::{SecurityConfig, SecurityHeadersMiddleware};
