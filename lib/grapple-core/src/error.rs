//! Error types for grapple.
//!
//! Every failure surfaces from the single execution step, never from the
//! request builder. Callers branch on [`Error::kind`]:
//!
//! | Kind                    | Raised when                                           |
//! |-------------------------|-------------------------------------------------------|
//! | [`ErrorKind::Deferred`] | [`Request::report`](crate::Request::report) was called |
//! | [`ErrorKind::Encoding`] | a variable or upload could not be serialized          |
//! | [`ErrorKind::Transport`]| connection, TLS, timeout, non-2xx or malformed body   |
//! | [`ErrorKind::Protocol`] | the server answered with a non-empty `errors` list    |

use std::fmt;

use derive_more::{Display, From};

use crate::response::GraphQlErrors;

/// Boxed error stored by [`Request::report`](crate::Request::report).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Error Kind
// ============================================================================

/// Coarse classification of an [`Error`].
///
/// Kinds are listed by precedence: a deferred error always wins over an
/// encoding error, which always wins over any transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reported by the caller while building the request.
    Deferred,
    /// A variable value or an upload stream could not be serialized.
    Encoding,
    /// The HTTP exchange failed.
    Transport,
    /// The server returned GraphQL errors.
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deferred => "deferred",
            Self::Encoding => "encoding",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Upload Error
// ============================================================================

/// Failure while reading an upload's byte source.
#[derive(Debug, Display, derive_more::Error)]
#[display("failed to read upload '{filename}' (field '{field}'): {source}")]
pub struct UploadError {
    field: String,
    filename: String,
    source: std::io::Error,
}

impl UploadError {
    /// Create an upload error for the given attachment.
    #[must_use]
    pub fn new(field: impl Into<String>, filename: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            source,
        }
    }

    /// Form field name of the failing upload.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Filename of the failing upload.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &std::io::Error {
        &self.source
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for grapple operations.
#[derive(Debug, Display, From)]
pub enum Error {
    /// Error reported on the request before it was executed.
    #[display("deferred request error: {_0}")]
    #[from(skip)]
    Deferred(BoxError),

    /// A variable value could not be converted to JSON.
    #[display("variable serialization error: {_0}")]
    #[from]
    Serialization(serde_json::Error),

    /// An upload stream failed while the body was being written.
    #[display("{_0}")]
    #[from]
    Upload(UploadError),

    /// A header name or value is not valid on the wire.
    #[display("invalid header: {_0}")]
    #[from(skip)]
    InvalidHeader(String),

    /// An upload field name cannot be placed in the variables.
    #[display("invalid upload path '{_0}'")]
    #[from(skip)]
    InvalidUploadPath(String),

    /// HTTP-level errors (non-2xx status codes).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        body: Option<bytes::Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Endpoint URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Response body is not a valid GraphQL envelope, or `data` does not
    /// match the requested type.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "data.user.name").
        path: String,
        /// Error message.
        message: String,
    },

    /// The server answered with GraphQL errors.
    #[display("GraphQL error: {errors}")]
    #[from(skip)]
    Protocol {
        /// Errors returned by the server, never empty.
        errors: GraphQlErrors,
        /// Partial `data` returned alongside the errors.
        data: Option<serde_json::Value>,
    },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Deferred(err) => Some(&**err),
            Self::Serialization(err) => Some(err),
            Self::Upload(err) => Some(err),
            Self::InvalidUrl(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a caller error as a deferred error.
    #[must_use]
    pub fn deferred(err: impl Into<BoxError>) -> Self {
        Self::Deferred(err.into())
    }

    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    /// Create an invalid upload path error.
    #[must_use]
    pub fn invalid_upload_path(path: impl Into<String>) -> Self {
        Self::InvalidUploadPath(path.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error from the server's `errors` and partial `data`.
    #[must_use]
    pub fn protocol(errors: GraphQlErrors, data: Option<serde_json::Value>) -> Self {
        Self::Protocol { errors, data }
    }

    /// Re-type an error yielded by a streamed request body.
    ///
    /// Upload failures keep their [`ErrorKind::Encoding`] kind; anything else
    /// is a connection error.
    #[must_use]
    pub fn from_body_error(err: BoxError) -> Self {
        match err.downcast::<UploadError>() {
            Ok(upload) => Self::Upload(*upload),
            Err(other) => Self::connection(other.to_string()),
        }
    }

    /// Look for an upload failure in an error's source chain.
    ///
    /// Transports that stream the body only see the upload failure wrapped in
    /// their own error type; this recovers it.
    #[must_use]
    pub fn upload_in_chain(err: &(dyn std::error::Error + 'static)) -> Option<Self> {
        let mut current = Some(err);
        while let Some(err) = current {
            if let Some(upload) = err.downcast_ref::<UploadError>() {
                let io = std::io::Error::new(upload.source.kind(), upload.source.to_string());
                return Some(Self::Upload(UploadError::new(
                    upload.field.clone(),
                    upload.filename.clone(),
                    io,
                )));
            }
            current = err.source();
        }
        None
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Deferred(_) => ErrorKind::Deferred,
            Self::Serialization(_)
            | Self::Upload(_)
            | Self::InvalidHeader(_)
            | Self::InvalidUploadPath(_) => ErrorKind::Encoding,
            Self::Http { .. }
            | Self::Connection(_)
            | Self::Tls(_)
            | Self::Timeout
            | Self::InvalidUrl(_)
            | Self::JsonDeserialization { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the server answered with GraphQL errors.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `None` if there is no body or this is not an HTTP error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }

    /// GraphQL errors, if this is a protocol error.
    #[must_use]
    pub fn graphql_errors(&self) -> Option<&GraphQlErrors> {
        match self {
            Self::Protocol { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Decode the partial `data` carried by a protocol error.
    ///
    /// Returns `None` if this is not a protocol error or the server sent no data.
    pub fn partial_data<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        match self {
            Self::Protocol {
                data: Some(data), ..
            } => Some(crate::from_value(data.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use assert2::{check, let_assert};

    use super::*;
    use crate::GraphQlError;

    #[test]
    fn error_display() {
        let err = Error::http(502, "Bad Gateway");
        check!(err.to_string() == "HTTP error 502: Bad Gateway");

        check!(Error::Timeout.to_string() == "request timeout");

        let err = Error::deferred("missing avatar");
        check!(err.to_string() == "deferred request error: missing avatar");

        let err = Error::json_deserialization("data.user.id", "invalid type: string");
        check!(err.to_string() == "JSON deserialization error at 'data.user.id': invalid type: string");
    }

    #[test]
    fn error_kind() {
        check!(Error::deferred("boom").kind() == ErrorKind::Deferred);
        check!(Error::invalid_header("bad name").kind() == ErrorKind::Encoding);
        let upload = UploadError::new("f", "a.txt", std::io::Error::other("gone"));
        check!(Error::from(upload).kind() == ErrorKind::Encoding);
        check!(Error::http(500, "Internal Server Error").kind() == ErrorKind::Transport);
        check!(Error::connection("refused").kind() == ErrorKind::Transport);
        check!(Error::Timeout.kind() == ErrorKind::Transport);
        check!(Error::json_deserialization("", "eof").kind() == ErrorKind::Transport);

        let errors = GraphQlErrors::from(vec![GraphQlError::new("denied")]);
        check!(Error::protocol(errors, None).kind() == ErrorKind::Protocol);
    }

    #[test]
    fn deferred_error_keeps_source() {
        let err = Error::deferred(std::io::Error::other("disk full"));
        let_assert!(Some(source) = err.source());
        check!(source.to_string() == "disk full");
    }

    #[test]
    fn body_errors_are_retyped() {
        let upload: BoxError = Box::new(UploadError::new(
            "f",
            "a.txt",
            std::io::Error::other("eof"),
        ));
        check!(Error::from_body_error(upload).kind() == ErrorKind::Encoding);

        let other: BoxError = "socket closed".into();
        let_assert!(Error::Connection(message) = Error::from_body_error(other));
        check!(message == "socket closed");
    }

    #[test]
    fn upload_found_in_source_chain() {
        let upload = UploadError::new("docs", "b.pdf", std::io::Error::other("truncated"));
        let wrapped = Error::from(upload);
        let_assert!(Some(Error::Upload(found)) = Error::upload_in_chain(&wrapped));
        check!(found.field() == "docs");
        check!(found.filename() == "b.pdf");

        check!(Error::upload_in_chain(&Error::Timeout).is_none());
    }

    #[test]
    fn upload_error_display() {
        let err = UploadError::new("avatar", "me.png", std::io::Error::other("closed"));
        check!(err.field() == "avatar");
        check!(err.filename() == "me.png");
        check!(err.to_string() == "failed to read upload 'me.png' (field 'avatar'): closed");
    }

    #[test]
    fn error_body() {
        let err = Error::http(404, "Not Found");
        check!(err.body().is_none());
        check!(err.status() == Some(404));

        let body = bytes::Bytes::from(r#"{"errors":[{"message":"bad query"}]}"#);
        let err = Error::http_with_body(400, "Bad Request", body.clone());
        check!(err.body() == Some(&body));

        let_assert!(Some(Ok(value)) = err.decode_body::<serde_json::Value>());
        check!(value["errors"][0]["message"] == "bad query");

        check!(Error::Timeout.decode_body::<serde_json::Value>().is_none());
    }

    #[test]
    fn protocol_error_exposes_partial_data() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Data {
            user: Option<String>,
        }

        let errors = GraphQlErrors::from(vec![GraphQlError::new("friends unavailable")]);
        let err = Error::protocol(errors, Some(serde_json::json!({ "user": "alice" })));

        check!(err.is_protocol());
        check!(err.to_string() == "GraphQL error: friends unavailable");
        let_assert!(Some(errors) = err.graphql_errors());
        check!(errors.len() == 1);

        let_assert!(Some(Ok(data)) = err.partial_data::<Data>());
        check!(
            data == Data {
                user: Some("alice".to_string())
            }
        );
    }
}
