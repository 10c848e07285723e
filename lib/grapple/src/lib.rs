//! GraphQL over HTTP client with multipart file uploads.
//!
//! Build a [`Request`], then execute it with a [`GraphQlClient`]. Requests
//! without files are sent as a JSON body; requests with files use the GraphQL
//! multipart request format, with file contents streamed from their sources.
//!
//! # Example
//!
//! ```ignore
//! use grapple::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct Uploaded {
//!     upload: bool,
//! }
//!
//! let client = GraphQlClient::builder("https://api.example.com/graphql")
//!     .bearer_auth("my-token")
//!     .logging()
//!     .build()?;
//!
//! let request = Request::new("mutation($file: Upload!) { upload(file: $file) }")
//!     .var("file", serde_json::Value::Null)
//!     .file("file", "report.pdf", pdf_bytes);
//!
//! let data: Uploaded = client.run(request).await?;
//! ```
//!
//! The transport-agnostic pieces live in [`grapple_core`]; any
//! [`Transport`] can be plugged into a [`grapple_core::Client`].

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod transport;

pub use client::{GraphQlClient, GraphQlClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_USER_AGENT};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use grapple_core::{
    Body, BodyStream, BoxError, ByteSource, ByteStream, Client, EncodingMode, Error, ErrorKind,
    Executor, FileMap, GraphQlError, GraphQlErrors, Headers, HttpRequest, HttpResponse, Location,
    Operations, PathSegment, Request, Response, Result, Transport, Upload, UploadError, Variables,
    encode,
};

pub use url;
