//! Blocking cassette client

use std::path::PathBuf;

use tracing::warn;

use super::{lookup, record, Step, DEFAULT_MAX_RESPONSE_SIZE};
use crate::archive::{Request, Response, Session};
use crate::config::{Config, RecordMode};
use crate::transport::{read_body, Transport, TransportResponse};
use crate::{CassetteError, Result};

/// Cassette client over a blocking [`Transport`]
///
/// Call [`CassetteClient::dispose`] once when done; interactions recorded
/// by a client that is dropped without it are lost.
pub struct CassetteClient<T> {
    session: Session,
    transport: T,
    max_response_size: usize,
}

impl<T: Transport> CassetteClient<T> {
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

    /// Open a cassette, run `f`, and persist afterwards even if `f` fails
    ///
    /// Returns the error from `f` if it failed, otherwise any persistence
    /// error, otherwise `f`'s value.
    ///
    /// # Errors
    ///
    /// Returns error if opening, `f`, or persisting fails
    pub fn scoped<F, R>(path: impl Into<PathBuf>, mode: RecordMode, transport: T, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        let mut client = Self::open(path, mode, transport)?;
        let outcome = f(&mut client);
        let disposed = client.dispose();

        match (outcome, disposed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), disposed) => {
                if let Err(persist_error) = disposed {
                    warn!("Failed to persist cassette after error: {persist_error}");
                }
                Err(e)
            }
        }
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
    pub fn request(&mut self, request: Request) -> Result<Response> {
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
                    .map_err(CassetteError::Transport)?;
                let body = read_body(body, self.max_response_size)?;
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
    /// See [`CassetteClient::request`]
    pub fn get(&mut self, url: &str) -> Result<Response> {
        self.request(Request::new("GET", url))
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

impl<T> CassetteClient<T> {
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
