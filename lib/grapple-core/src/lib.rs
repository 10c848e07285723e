//! Core types and traits for the grapple GraphQL client.
//!
//! This crate provides the transport-agnostic part of grapple:
//! - [`Request`] - GraphQL request builder (query, variables, uploads, headers)
//! - [`Headers`] - Case-insensitive multi-valued header store
//! - [`Upload`] and [`ByteSource`] - File attachments, read lazily
//! - [`encode`] - JSON or multipart wire encoding of a request
//! - [`Form`] and [`Part`] - Streaming multipart writer
//! - [`Response`] and [`GraphQlError`] - Decoded GraphQL response envelope
//! - [`Error`], [`ErrorKind`] and [`Result`] - Error handling
//! - [`Transport`] - HTTP transport boundary
//! - [`Executor`] and [`Client`] - Execution boundary
//!
//! # Example
//!
//! ```ignore
//! use grapple_core::{Client, Request};
//!
//! let client = Client::new(transport, "https://api.example.com/graphql")?;
//!
//! let request = Request::new("mutation($f: Upload!) { upload(file: $f) { id } }")
//!     .header("Authorization", "Bearer token")
//!     .var("f", serde_json::Value::Null)
//!     .file("f", "a.txt", "hello");
//!
//! let response = request.run(&client).await?;
//! ```

mod body;
mod client;
mod encode;
mod error;
mod header;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;
mod upload;

pub use body::{Body, BodyStream, ContentType, from_json, from_value, to_json};
pub use client::{Client, Executor};
pub use encode::{ACCEPT, CONTENT_TYPE, EncodingMode, FileMap, Operations, encode};
pub use error::{BoxError, Error, ErrorKind, Result, UploadError};
pub use header::Headers;
pub use multipart::{Form, Part};
pub use request::{Request, Variables};
pub use response::{
    GraphQlError, GraphQlErrors, HttpResponse, Location, PathSegment, Response,
};
pub use transport::{HttpRequest, Transport};
pub use upload::{ByteSource, ByteStream, Upload};
