//! Archive data model and its JSON encoding
//!
//! A cassette file is a pretty-printed JSON array of interactions:
//!
//! ```json
//! [
//!   {
//!     "recordedAt": "2024-05-01T12:30:00",
//!     "request": { "url": "...", "headers": {}, "body": "", "method": "GET" },
//!     "response": { "version": "HTTP/1.1", "status": "200 OK", "headers": {}, "body": "..." }
//!   }
//! ]
//! ```

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{CassetteError, Result};

/// Timestamp format for `recordedAt`
pub const RECORDED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Header map; keys sort, so encoding is stable
pub type Headers = BTreeMap<String, String>;

/// An outbound request, as issued by a caller and as archived
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: String,
    /// HTTP method (e.g., "GET", "POST")
    pub method: String,
}

impl Request {
    /// Create a request with no headers and an empty body
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Headers::new(),
            body: String::new(),
            method: method.into(),
        }
    }

    /// Set a header, replacing any previous value
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A fully materialized response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version (e.g., "HTTP/1.1")
    pub version: String,
    /// Status line (e.g., "200 OK")
    pub status: String,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: String,
}

impl Response {
    /// Numeric status code parsed from the status line
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status.split_whitespace().next()?.parse().ok()
    }
}

/// One recorded request/response pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Local time of recording, `yyyy-MM-ddTHH:mm:ss`
    #[serde(rename = "recordedAt")]
    pub recorded_at: String,
    /// What was asked
    pub request: Request,
    /// What was received
    pub response: Response,
}

impl Interaction {
    /// Create an interaction stamped with the current local time
    #[must_use]
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            recorded_at: Local::now().format(RECORDED_AT_FORMAT).to_string(),
            request,
            response,
        }
    }
}

/// Ordered sequence of interactions, in recording order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archive {
    interactions: Vec<Interaction>,
}

impl Archive {
    /// Create an empty archive
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether the archive has no interactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Interaction at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Interaction> {
        self.interactions.get(index)
    }

    /// Iterate in recording order
    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.interactions.iter()
    }

    /// All interactions in recording order
    #[must_use]
    pub fn as_slice(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Append at the end
    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }
}

impl From<Vec<Interaction>> for Archive {
    fn from(interactions: Vec<Interaction>) -> Self {
        Self { interactions }
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = &'a Interaction;
    type IntoIter = std::slice::Iter<'a, Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.interactions.iter()
    }
}

/// Decode an archive from raw file content
///
/// # Errors
///
/// Returns `InvalidArchiveFormat` if the content is not valid JSON or an
/// interaction is missing a required field
pub fn decode(raw: &[u8]) -> Result<Archive> {
    serde_json::from_slice(raw).map_err(|e| CassetteError::InvalidArchiveFormat(e.to_string()))
}

/// Encode an archive as pretty-printed JSON with a trailing newline
///
/// # Errors
///
/// Returns error if serialization fails
pub fn encode(archive: &Archive) -> Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(archive).map_err(std::io::Error::other)?;
    data.push(b'\n');
    Ok(data)
}
