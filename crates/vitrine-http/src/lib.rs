//! HTTP primitives for Vitrine.
//!
//! - [`Request`] / [`Response`] - framework-level request and response types
//! - [`Handler`] / [`Middleware`] / [`MiddlewareChain`] - request processing
//! - [`Router`] - method + path pattern dispatch with `{name}` parameters

pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;

pub use error::{Error, Result};
pub use middleware::{Handler, Middleware, MiddlewareChain};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use router::{PathPattern, Router};

pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version};
