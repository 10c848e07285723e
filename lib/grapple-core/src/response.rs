//! Response handling.
//!
//! [`HttpResponse`] is what a [`Transport`](crate::Transport) returns.
//! [`Response`] is the decoded GraphQL envelope: `data`, `errors` and
//! `extensions`. Errors and partial data are both kept.
//!
//! # Example
//!
//! ```ignore
//! let response = request.run(&client).await?;
//! if response.has_errors() {
//!     eprintln!("partial result: {:?}", response.errors());
//! }
//! let user: Option<User> = response.data()?;
//! ```

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Headers, Result};

// ============================================================================
// HTTP Response
// ============================================================================

/// HTTP response with status, headers, and buffered body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl HttpResponse {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

// ============================================================================
// GraphQL Errors
// ============================================================================

/// Position of an error in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// One segment of an error path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object field.
    Field(String),
    /// List index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// An entry of the response `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    /// Error description.
    pub message: String,
    /// Query positions the error refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Response path of the field that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Server-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GraphQlError {
    /// Create an error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(path) = &self.path {
            let path = path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

/// The `errors` list of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphQlErrors(Vec<GraphQlError>);

impl GraphQlErrors {
    /// Consume into the inner list.
    #[must_use]
    pub fn into_inner(self) -> Vec<GraphQlError> {
        self.0
    }
}

impl Deref for GraphQlErrors {
    type Target = [GraphQlError];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<GraphQlError>> for GraphQlErrors {
    fn from(errors: Vec<GraphQlError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for GraphQlErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.0.iter();
        match errors.next() {
            None => f.write_str("no error"),
            Some(first) => {
                write!(f, "{first}")?;
                let more = errors.count();
                if more > 0 {
                    write!(f, " (and {more} more)")?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// GraphQL Response
// ============================================================================

/// Decoded GraphQL response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable_errors")]
    errors: GraphQlErrors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `"errors": null` is read as an empty list.
fn nullable_errors<'de, D>(deserializer: D) -> std::result::Result<GraphQlErrors, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<GraphQlErrors>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Response {
    /// Creates a response.
    #[must_use]
    pub fn new(data: Option<serde_json::Value>, errors: GraphQlErrors) -> Self {
        Self {
            data,
            errors,
            extensions: None,
        }
    }

    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`](crate::Error::JsonDeserialization)
    /// if the body is not a GraphQL response object.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        crate::from_json(body)
    }

    /// Raw `data`, `None` when absent or `null`.
    #[must_use]
    pub fn raw_data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref().filter(|data| !data.is_null())
    }

    /// Decode `data` into `T`.
    ///
    /// Returns `Ok(None)` when the server sent no data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`](crate::Error::JsonDeserialization)
    /// when `data` does not match `T`. The path starts inside `data`
    /// (`me.id`, not `data.me.id`).
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> Result<Option<T>> {
        self.raw_data()
            .map(|data| crate::from_value(data.clone()))
            .transpose()
    }

    /// GraphQL errors, empty on success.
    #[must_use]
    pub fn errors(&self) -> &GraphQlErrors {
        &self.errors
    }

    /// Returns `true` if the server sent at least one error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Response `extensions`.
    #[must_use]
    pub fn extensions(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.extensions.as_ref()
    }

    /// Consume into (data, errors).
    #[must_use]
    pub fn into_parts(self) -> (Option<serde_json::Value>, GraphQlErrors) {
        (self.data.filter(|data| !data.is_null()), self.errors)
    }

    /// Decode `data` into `T`, failing on GraphQL errors.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`](crate::Error::Protocol) when `errors` is not
    ///   empty; the partial data stays available on the error,
    /// - [`Error::JsonDeserialization`](crate::Error::JsonDeserialization) when
    ///   `data` is missing or does not match `T`.
    pub fn into_result<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let (data, errors) = self.into_parts();
        if !errors.is_empty() {
            return Err(crate::Error::protocol(errors, data));
        }
        crate::from_value(data.unwrap_or(serde_json::Value::Null))
    }
}
