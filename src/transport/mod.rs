//! Wrapped transport interfaces
//!
//! A cassette client delegates real requests to a transport. The blocking
//! [`Transport`] hands back a [`std::io::Read`] body; the suspending
//! [`AsyncTransport`] hands back a [`hyper::body::Body`]. Either way the
//! client materializes the full body before recording anything.

mod blocking;
mod body;
mod http;

use std::future::Future;

pub use blocking::BlockingHttpTransport;
pub use body::{collect_body, decode_body, read_body};
pub use http::{HttpError, HttpTransport};

use crate::archive::{Headers, Request};

/// Error type reported by transports
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Response as produced by a transport, body not yet read
#[derive(Debug)]
pub struct TransportResponse<B> {
    /// Protocol version (e.g., "HTTP/1.1")
    pub version: String,
    /// Status line (e.g., "200 OK")
    pub status: String,
    /// Response headers
    pub headers: Headers,
    /// Body source
    pub body: B,
}

impl<B> TransportResponse<B> {
    /// Replace the body, keeping version, status and headers
    pub fn map_body<C>(self, f: impl FnOnce(B) -> C) -> TransportResponse<C> {
        TransportResponse {
            version: self.version,
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

/// Blocking transport: the caller's thread waits for the response
pub trait Transport {
    /// Body source, read to the end by the client
    type Body: std::io::Read;

    /// Perform a real request
    ///
    /// # Errors
    ///
    /// Returns the transport's own error on failure
    fn request(&self, request: &Request) -> Result<TransportResponse<Self::Body>, BoxError>;

    /// Release transport resources
    fn close(&self) {}
}

/// Suspending transport: the request future yields while I/O is pending
pub trait AsyncTransport {
    /// Body source, collected by the client
    type Body: hyper::body::Body<Error: Into<BoxError>> + Send;

    /// Perform a real request
    fn request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, BoxError>> + Send;

    /// Release transport resources
    fn close(&self) {}
}

impl<T: Transport + ?Sized> Transport for &T {
    type Body = T::Body;

    fn request(&self, request: &Request) -> Result<TransportResponse<Self::Body>, BoxError> {
        (**self).request(request)
    }

    fn close(&self) {
        (**self).close();
    }
}

impl<T: AsyncTransport + ?Sized> AsyncTransport for &T {
    type Body = T::Body;

    fn request(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, BoxError>> + Send {
        (**self).request(request)
    }

    fn close(&self) {
        (**self).close();
    }
}

/// Render an HTTP version the way archives store it
#[must_use]
pub fn version_string(version: hyper::Version) -> String {
    format!("{version:?}")
}

/// Render a status code as a status line (e.g., "404 Not Found")
#[must_use]
pub fn status_line(status: hyper::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_str()),
        None => status.as_str().to_string(),
    }
}

/// Flatten a header map; repeated names are joined with ", "
#[must_use]
pub fn flatten_headers(headers: &hyper::HeaderMap) -> Headers {
    let mut flat = Headers::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flat.entry(name.to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    flat
}
