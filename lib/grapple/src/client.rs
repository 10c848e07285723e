//! GraphQL client bound to one endpoint.

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::{
    ClientConfig, Error, Executor, Headers, HyperTransport, HyperTransportBuilder, Request,
    Response, Result,
};

/// GraphQL client over the hyper transport.
///
/// Cloning is cheap: clones share the connection pool and middleware stack.
///
/// # Example
///
/// ```ignore
/// use grapple::{GraphQlClient, Request};
///
/// let client = GraphQlClient::builder("https://api.example.com/graphql")
///     .bearer_auth("my-token")
///     .build()?;
///
/// let request = Request::new("mutation($file: Upload!) { upload(file: $file) { id } }")
///     .var("file", serde_json::Value::Null)
///     .file("file", "avatar.png", png_bytes);
///
/// let data: UploadData = client.run(request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    inner: grapple_core::Client<HyperTransport>,
}

impl GraphQlClient {
    /// Create a client for the endpoint with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::builder(endpoint).build()
    }

    /// Create a client for the endpoint over an existing transport.
    ///
    /// Useful for sharing one connection pool between several endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn with_transport(transport: HyperTransport, endpoint: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            inner: grapple_core::Client::new(transport, endpoint)?,
        })
    }

    /// Create a client builder for the endpoint.
    #[must_use]
    pub fn builder(endpoint: impl AsRef<str>) -> GraphQlClientBuilder {
        GraphQlClientBuilder::new(endpoint)
    }

    /// GraphQL endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.inner.endpoint()
    }

    /// Get a reference to the transport.
    #[must_use]
    pub fn transport(&self) -> &HyperTransport {
        self.inner.transport()
    }

    /// Execute the request and decode `data` into `D`.
    ///
    /// # Errors
    ///
    /// See [`grapple_core::Client::run`].
    pub async fn run<D: serde::de::DeserializeOwned>(&self, request: Request) -> Result<D> {
        self.inner.run(request).await
    }
}

impl Executor for GraphQlClient {
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.inner.execute(request)
    }
}

/// Builder for [`GraphQlClient`].
#[derive(Debug)]
pub struct GraphQlClientBuilder {
    endpoint: String,
    transport: HyperTransportBuilder,
    default_headers: Headers,
}

impl GraphQlClientBuilder {
    /// Create a builder for the endpoint.
    #[must_use]
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self {
            endpoint: endpoint.as_ref().to_string(),
            transport: HyperTransport::builder(),
            default_headers: Headers::new(),
        }
    }

    /// Replace the transport configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.transport = self.transport.config(config);
        self
    }

    /// Set the exchange timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.connect_timeout(timeout);
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport = self.transport.user_agent(user_agent);
        self
    }

    /// Add a header sent with every request that does not set it.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.append(name, value);
        self
    }

    /// Authenticate every request with a bearer token.
    #[must_use]
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.transport = self.transport.with_bearer_auth(token);
        self
    }

    /// Log every exchange.
    #[must_use]
    pub fn logging(mut self) -> Self {
        self.transport = self.transport.with_logging();
        self
    }

    /// Customize the transport, e.g. to add layers.
    #[must_use]
    pub fn transport(mut self, f: impl FnOnce(HyperTransportBuilder) -> HyperTransportBuilder) -> Self {
        self.transport = f(self.transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be parsed.
    pub fn build(self) -> Result<GraphQlClient> {
        let endpoint = Url::parse(&self.endpoint).map_err(Error::InvalidUrl)?;

        let mut transport = self.transport;
        if !self.default_headers.is_empty() {
            transport = transport.with_default_headers(self.default_headers);
        }

        Ok(GraphQlClient {
            inner: grapple_core::Client::with_url(transport.build(), endpoint),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn builder_keeps_endpoint_and_config() {
        let_assert!(
            Ok(client) = GraphQlClient::builder("http://localhost:4000/graphql")
                .timeout(Duration::from_secs(5))
                .user_agent("tests")
                .build()
        );

        check!(client.endpoint().as_str() == "http://localhost:4000/graphql");
        check!(client.transport().config().timeout == Duration::from_secs(5));
        check!(client.transport().config().user_agent == "tests");
    }

    #[test]
    fn invalid_endpoint() {
        let_assert!(Err(err) = GraphQlClient::new("not a url"));
        check!(matches!(err, Error::InvalidUrl(_)));
        check!(err.kind() == crate::ErrorKind::Transport);
    }

    #[test]
    fn shared_transport() {
        let transport = HyperTransport::new();
        let_assert!(Ok(a) = GraphQlClient::with_transport(transport.clone(), "http://a.test/graphql"));
        let_assert!(Ok(b) = GraphQlClient::with_transport(transport, "http://b.test/graphql"));
        check!(a.endpoint() != b.endpoint());
    }
}
