//! Blocking adapter over [`HttpTransport`]

use std::io::Cursor;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use tokio::runtime::{Builder, Runtime};

use super::{AsyncTransport, BoxError, HttpTransport, Transport, TransportResponse};
use crate::archive::Request;
use crate::config::HttpConfig;

/// Blocking HTTP transport driving [`HttpTransport`] on a private runtime
///
/// Must not be called from inside an async context: blocking on the
/// private runtime from a runtime worker panics.
pub struct BlockingHttpTransport {
    runtime: Runtime,
    inner: HttpTransport,
}

impl BlockingHttpTransport {
    /// Create a transport with default pool settings
    ///
    /// # Errors
    ///
    /// Returns error if the runtime cannot be started
    pub fn new() -> std::io::Result<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create a transport with the given pool settings
    ///
    /// # Errors
    ///
    /// Returns error if the runtime cannot be started
    pub fn with_config(config: &HttpConfig) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            inner: HttpTransport::with_config(config),
        })
    }

    /// Whether [`Transport::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Transport for BlockingHttpTransport {
    type Body = Cursor<Bytes>;

    fn request(&self, request: &Request) -> Result<TransportResponse<Cursor<Bytes>>, BoxError> {
        self.runtime.block_on(async {
            let TransportResponse {
                version,
                status,
                headers,
                body,
            } = self.inner.send(request).await?;
            let bytes = body.collect().await?.to_bytes();
            Ok::<_, BoxError>(TransportResponse {
                version,
                status,
                headers,
                body: Cursor::new(bytes),
            })
        })
    }

    fn close(&self) {
        AsyncTransport::close(&self.inner);
    }
}
