//! HTTP transport boundary.
//!
//! The core never opens connections itself: it encodes a [`HttpRequest`] and
//! hands it to a [`Transport`]. The `grapple` crate provides a hyper-based
//! implementation; tests use in-memory ones.

use std::future::Future;

use url::Url;

use crate::{Body, Headers, HttpResponse, Result};

/// An encoded GraphQL HTTP request, always sent with `POST`.
#[derive(Debug)]
pub struct HttpRequest {
    url: Url,
    headers: Headers,
    body: Body,
}

impl HttpRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(url: Url, headers: Headers, body: Body) -> Self {
        Self { url, headers, body }
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Consume into (url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Url, Headers, Body) {
        (self.url, self.headers, self.body)
    }
}

/// Sends encoded requests.
///
/// Implementations must not retry: a request body may be a single-use stream.
pub trait Transport: Send + Sync {
    /// Send the request and return the buffered response.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Invalid headers
    /// - Upload stream failures while the body is written
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl<T: Transport> Transport for &T {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).send(request)
    }
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).send(request)
    }
}
