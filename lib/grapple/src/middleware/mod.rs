//! Tower middleware layers for the grapple transport.
//!
//! Layers wrap the type-erased transport service and see every encoded
//! [`HttpRequest`](crate::HttpRequest) before it is sent. They are added with
//! [`HyperTransportBuilder::layer`](crate::HyperTransportBuilder::layer) or
//! one of its `with_*` helpers; the first layer added is the outermost.
//!
//! # Available Layers
//!
//! - [`BearerAuthLayer`] - Adds `Authorization: Bearer <token>` header
//! - [`DefaultHeadersLayer`] - Adds headers the request does not set itself
//! - [`LoggingLayer`] - Logs exchanges using `tracing`
//! - [`ConcurrencyLimitLayer`] - Limits in-flight requests (from tower)
//!
//! # Example
//!
//! ```ignore
//! use grapple::HyperTransport;
//! use grapple::middleware::BearerAuthLayer;
//!
//! let transport = HyperTransport::builder()
//!     .layer(BearerAuthLayer::new("my-token"))
//!     .with_logging()
//!     .build();
//! ```
//!
//! No retry layer is provided: a multipart body is a single-use stream.

mod bearer_auth;
mod default_headers;
mod logging;

pub use bearer_auth::{BearerAuth, BearerAuthLayer};
pub use default_headers::{DefaultHeaders, DefaultHeadersLayer};
pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
