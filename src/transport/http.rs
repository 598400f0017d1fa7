//! Hyper-backed HTTP transport

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tracing::{debug, warn};

use super::{flatten_headers, status_line, version_string, AsyncTransport, BoxError, TransportResponse};
use crate::archive::Request;
use crate::config::HttpConfig;

/// Errors raised by [`HttpTransport`]
#[derive(Debug, Error)]
pub enum HttpError {
    /// Method string is not a valid HTTP method
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// URL could not be parsed
    #[error("Invalid URI '{uri}': {source}")]
    InvalidUri {
        /// Offending URL
        uri: String,
        /// Parse error
        source: hyper::http::uri::InvalidUri,
    },

    /// Request could not be assembled (e.g., bad header)
    #[error("Failed to build request: {0}")]
    Build(#[from] hyper::http::Error),

    /// Connection or protocol failure
    #[error("Request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    /// Transport was closed
    #[error("Transport is closed")]
    Closed,
}

/// HTTP/1 and HTTP/2 client over plain TCP
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Create a transport with default pool settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&HttpConfig::default())
    }

    /// Create a transport with the given pool settings
    #[must_use]
    pub fn with_config(config: &HttpConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build_http();

        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Whether [`AsyncTransport::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a request and return the response with its body unread
    ///
    /// # Errors
    ///
    /// Returns error if the request is malformed or the exchange fails
    pub async fn send(&self, request: &Request) -> Result<TransportResponse<Incoming>, HttpError> {
        if self.is_closed() {
            return Err(HttpError::Closed);
        }

        let http_request = build_request(request)?;

        debug!("Sending {} {}", request.method, request.url);

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            HttpError::Request(e)
        })?;

        let (parts, body) = response.into_parts();
        Ok(TransportResponse {
            version: version_string(parts.version),
            status: status_line(parts.status),
            headers: flatten_headers(&parts.headers),
            body,
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncTransport for HttpTransport {
    type Body = Incoming;

    fn request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Incoming>, BoxError>> + Send {
        async move { self.send(request).await.map_err(BoxError::from) }
    }

    fn close(&self) {
        debug!("Closing HTTP transport");
        self.closed.store(true, Ordering::Release);
    }
}

/// Build a hyper request from an archived request
fn build_request(request: &Request) -> Result<hyper::Request<Full<Bytes>>, HttpError> {
    let method = request
        .method
        .parse::<Method>()
        .map_err(|_| HttpError::InvalidMethod(request.method.clone()))?;

    let uri = request
        .url
        .parse::<Uri>()
        .map_err(|source| HttpError::InvalidUri {
            uri: request.url.clone(),
            source,
        })?;

    let mut builder = hyper::Request::builder().method(method).uri(uri);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(Bytes::from(request.body.clone())))?)
}
