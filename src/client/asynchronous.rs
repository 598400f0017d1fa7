//! Suspending cassette client

use std::path::PathBuf;

use super::{lookup, record, Step, DEFAULT_MAX_RESPONSE_SIZE};
use crate::archive::{Request, Response, Session};
use crate::config::{Config, RecordMode};
use crate::transport::{collect_body, AsyncTransport, TransportResponse};
use crate::{CassetteError, Result};

/// Cassette client over a suspending [`AsyncTransport`]
///
/// A request only yields while the transport is sending or its body is
/// being collected. If the request future is dropped at that point
/// nothing is appended: interactions are recorded only once the whole
/// body is in hand.
///
/// Call [`AsyncCassetteClient::dispose`] once when done.
pub struct AsyncCassetteClient<T> {
    session: Session,
    transport: T,
    max_response_size: usize,
}

impl<T: AsyncTransport> AsyncCassetteClient<T> {
    /// Wrap `transport` with an already opened session
    #[must_use]
    pub fn new(session: Session, transport: T) -> Self {
        Self {
            session,
            transport,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Open the cassette at `path` and wrap `transport`
    ///
    /// The archive is read synchronously; cassettes are small fixtures.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArchiveFormat` if the cassette exists but is malformed
    pub fn open(path: impl Into<PathBuf>, mode: RecordMode, transport: T) -> Result<Self> {
        Ok(Self::new(Session::open(path, mode)?, transport))
    }

    /// Open the named cassette using a configuration
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid or the cassette is malformed
    pub fn from_config(config: &Config, name: &str, transport: T) -> Result<Self> {
        let path = config.cassette_path(name)?;
        Ok(Self::open(path, config.record_mode, transport)?
            .with_max_response_size(config.limits.max_response_size))
    }

    /// Cap the size of response bodies materialized while recording
    #[must_use]
    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    /// Issue a request: replay it if archived, otherwise record it when
    /// the record mode allows
    ///
    /// # Errors
    ///
    /// Returns `CannotRecord` if the mode forbids recording, or the wrapped
    /// transport's error unchanged; the archive is untouched in both cases
    pub async fn request(&mut self, request: Request) -> Result<Response> {
        match lookup(&self.session, &request)? {
            Step::Replay(response) => Ok(response),
            Step::Record => {
                let TransportResponse {
                    version,
                    status,
                    headers,
                    body,
                } = self
                    .transport
                    .request(&request)
                    .await
                    .map_err(CassetteError::Transport)?;
                let body = collect_body(body, self.max_response_size).await?;
                let response = TransportResponse {
                    version,
                    status,
                    headers,
                    body,
                };
                Ok(record(&mut self.session, request, response))
            }
        }
    }

    /// Issue a GET with no headers and an empty body
    ///
    /// # Errors
    ///
    /// See [`AsyncCassetteClient::request`]
    pub async fn get(&mut self, url: &str) -> Result<Response> {
        self.request(Request::new("GET", url)).await
    }

    /// Close the wrapped transport; the archive is not touched
    pub fn close(&self) {
        self.transport.close();
    }

    /// Persist newly recorded interactions and release the session
    ///
    /// # Errors
    ///
    /// Returns error if the cassette cannot be written
    pub fn dispose(mut self) -> Result<()> {
        self.session.persist()
    }
}

impl<T> AsyncCassetteClient<T> {
    /// The underlying session
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Active record mode
    #[must_use]
    pub fn mode(&self) -> RecordMode {
        self.session.mode()
    }

    /// The wrapped transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Split into session and transport without persisting
    #[must_use]
    pub fn into_parts(self) -> (Session, T) {
        (self.session, self.transport)
    }
}
