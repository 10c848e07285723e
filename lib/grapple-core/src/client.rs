//! Execution boundary.
//!
//! - [`Executor`] - runs a [`Request`] and returns the decoded [`Response`]
//! - [`Client`] - an [`Executor`] over any [`Transport`], bound to one endpoint
//!
//! Execution is strictly ordered: a reported error is returned before
//! anything is encoded, encoding errors before anything is sent, and GraphQL
//! errors are only seen after a successful HTTP exchange.

use std::future::Future;

use tracing::{debug, warn};
use url::Url;

use crate::{Error, Request, Response, Result, Transport, encode};

/// Runs GraphQL requests.
pub trait Executor: Send + Sync {
    /// Execute the request and decode the response envelope.
    ///
    /// GraphQL `errors` are not an error here: they are returned in the
    /// [`Response`] next to any partial data.
    ///
    /// # Errors
    ///
    /// In order of precedence:
    /// - [`Error::Deferred`] if an error was reported on the request,
    /// - an encoding error if a variable or upload could not be serialized,
    /// - a transport error if the HTTP exchange failed, the status was not 2xx,
    ///   or the body is not a GraphQL response.
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

impl<E: Executor> Executor for &E {
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (**self).execute(request)
    }
}

/// GraphQL client over a [`Transport`].
///
/// # Example
///
/// ```ignore
/// use grapple_core::{Client, Request};
///
/// let client = Client::new(transport, "https://api.example.com/graphql")?;
/// let me: Me = client.run(Request::new("{ me { id } }")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
    endpoint: Url,
}

impl<T> Client<T> {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(transport: T, endpoint: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            transport,
            endpoint: Url::parse(endpoint.as_ref())?,
        })
    }

    /// Create a client with a pre-parsed endpoint.
    #[must_use]
    pub fn with_url(transport: T, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    /// GraphQL endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get a reference to the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consume the client and return the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: Transport> Client<T> {
    /// Execute the request and decode `data` into `D`.
    ///
    /// # Errors
    ///
    /// Everything [`Executor::execute`] returns, plus [`Error::Protocol`] when
    /// the server sent GraphQL errors (partial data stays on the error).
    pub async fn run<D: serde::de::DeserializeOwned>(&self, request: Request) -> Result<D> {
        self.execute(request).await?.into_result()
    }
}

impl<T: Transport> Executor for Client<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        let http_request = encode(request, &self.endpoint)?;
        let response = self.transport.send(http_request).await?;

        let status = response.status();
        if !response.is_success() {
            warn!(status, endpoint = %self.endpoint, "GraphQL endpoint answered with HTTP error");
            let (_, _, body) = response.into_parts();
            return Err(Error::http_with_body(status, status_message(status), body));
        }

        let response = Response::from_body(response.body())?;
        debug!(
            status,
            errors = response.errors().len(),
            has_data = response.raw_data().is_some(),
            "GraphQL response decoded"
        );
        Ok(response)
    }
}

fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unexpected status",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use bytes::Bytes;

    use super::*;
    use crate::{ErrorKind, Headers, HttpRequest, HttpResponse};

    /// Transport answering every request with a fixed response.
    struct MockTransport {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
        bodies: Mutex<Vec<(Headers, Bytes)>>,
    }

    impl MockTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (_, headers, body) = request.into_parts();
            let body = body.collect().await?;
            self.bodies
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((headers, body));
            Ok(HttpResponse::new(
                self.status,
                Headers::new(),
                Bytes::from_static(self.body.as_bytes()),
            ))
        }
    }

    fn client(transport: &MockTransport) -> Client<&MockTransport> {
        Client::new(transport, "http://localhost/graphql").expect("valid endpoint")
    }

    #[tokio::test]
    async fn reported_error_sends_nothing() {
        let transport = MockTransport::new(200, r#"{"data":{}}"#);
        let request = Request::new("{ me { id } }")
            .var("a", 1)
            .file("f", "a.txt", "x")
            .report("avatar missing");

        let_assert!(Err(err) = request.run(&client(&transport)).await);
        check!(err.kind() == ErrorKind::Deferred);
        check!(err.to_string() == "deferred request error: avatar missing");
        check!(transport.calls() == 0);
    }

    #[tokio::test]
    async fn json_request_round_trip() {
        let transport = MockTransport::new(200, r#"{"data":{"echo":"hi"}}"#);
        let request = Request::new("query($m: String) { echo(m: $m) }").var("m", "hi");

        let_assert!(Ok(response) = client(&transport).execute(request).await);
        check!(!response.has_errors());
        check!(transport.calls() == 1);

        let bodies = transport.bodies.lock().expect("lock");
        let_assert!(Some((headers, body)) = bodies.first());
        check!(headers.get("Content-Type") == Some("application/json; charset=utf-8"));
        check!(
            body.as_ref() == br#"{"query":"query($m: String) { echo(m: $m) }","variables":{"m":"hi"}}"#
        );
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let transport = MockTransport::new(502, "upstream down");

        let_assert!(Err(err) = client(&transport).execute(Request::new("{ x }")).await);
        check!(err.kind() == ErrorKind::Transport);
        check!(err.status() == Some(502));
        check!(err.body() == Some(&Bytes::from_static(b"upstream down")));
    }

    #[tokio::test]
    async fn malformed_body_is_transport_error() {
        let transport = MockTransport::new(200, "not json");

        let_assert!(Err(err) = client(&transport).execute(Request::new("{ x }")).await);
        check!(err.kind() == ErrorKind::Transport);
    }

    #[tokio::test]
    async fn protocol_errors_keep_partial_data() {
        #[derive(Debug, serde::Deserialize)]
        struct Data {
            a: Option<u32>,
            b: Option<u32>,
        }

        let transport = MockTransport::new(
            200,
            r#"{"data":{"a":1,"b":null},"errors":[{"message":"b failed","path":["b"]}]}"#,
        );
        let client = client(&transport);

        let_assert!(Ok(response) = client.execute(Request::new("{ a b }")).await);
        check!(response.has_errors());
        let_assert!(Ok(Some(data)) = response.data::<Data>());
        check!(data.a == Some(1));

        let_assert!(Err(err) = client.run::<Data>(Request::new("{ a b }")).await);
        check!(err.kind() == ErrorKind::Protocol);
        let_assert!(Some(Ok(partial)) = err.partial_data::<Data>());
        check!(partial.a == Some(1));
        check!(partial.b.is_none());
    }

    #[tokio::test]
    async fn upload_failure_is_encoding_error() {
        use futures_util::stream;

        let transport = MockTransport::new(200, r#"{"data":{}}"#);
        let failing = crate::ByteSource::from_stream(stream::iter(vec![Err(
            std::io::Error::other("unreadable"),
        )]));
        let request = Request::new("mutation($f: Upload!) { up(f: $f) }").file("f", "a.txt", failing);

        let_assert!(Err(err) = client(&transport).execute(request).await);
        check!(err.kind() == ErrorKind::Encoding);
    }

    #[test]
    fn invalid_endpoint() {
        let transport = MockTransport::new(200, "{}");
        let_assert!(Err(err) = Client::new(&transport, "not a url"));
        check!(matches!(err, Error::InvalidUrl(_)));
    }
}
