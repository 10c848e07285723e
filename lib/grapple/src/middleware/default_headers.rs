//! Default headers middleware.
//!
//! Adds a fixed set of headers to every request. A header the request
//! already carries is left untouched, whatever its case.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::{Error, Headers, HttpRequest, HttpResponse, Result};

/// Layer that adds default headers to requests.
#[derive(Debug, Clone)]
pub struct DefaultHeadersLayer {
    headers: Arc<Headers>,
}

impl DefaultHeadersLayer {
    /// Create a layer adding the given headers.
    #[must_use]
    pub fn new(headers: Headers) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeaders {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service that adds default headers to requests.
#[derive(Debug, Clone)]
pub struct DefaultHeaders<S> {
    inner: S,
    headers: Arc<Headers>,
}

fn apply_defaults(defaults: &Headers, headers: &mut Headers) {
    let missing: Vec<_> = defaults
        .iter()
        .filter(|(name, _)| !headers.contains(name))
        .collect();
    headers.extend(missing);
}

impl<S> Service<HttpRequest> for DefaultHeaders<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: HttpRequest) -> Self::Future {
        apply_defaults(&self.headers, request.headers_mut());

        // Call the instance that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}
