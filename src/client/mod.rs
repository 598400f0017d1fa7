//! Cassette clients: replay from the archive or delegate and record
//!
//! [`CassetteClient`] blocks its caller; [`AsyncCassetteClient`] suspends
//! while the wrapped transport is busy. Lookup and the record-mode decision
//! are shared and never suspend.

mod asynchronous;
mod blocking;

pub use asynchronous::AsyncCassetteClient;
pub use blocking::CassetteClient;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::archive::{Interaction, Request, Response, Session};
use crate::policy::{self, Decision};
use crate::transport::{decode_body, TransportResponse};
use crate::{CassetteError, Result};

/// Default cap on materialized response bodies
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 256 * 1024 * 1024;

/// Result of the lookup and policy steps
#[derive(Debug)]
enum Step {
    /// Serve this archived response
    Replay(Response),
    /// Delegate to the transport and record
    Record,
}

/// Look up `request` in the session and apply the record mode
fn lookup(session: &Session, request: &Request) -> Result<Step> {
    let found = session.find(&request.url, &request.method);

    match policy::decide(session.mode(), found, session.was_blank()) {
        Decision::Replay(index) => {
            let interaction = &session.interactions()[index];
            debug!(
                "Replaying {} {} from interaction {} (recorded {})",
                request.method, request.url, index, interaction.recorded_at
            );
            Ok(Step::Replay(interaction.response.clone()))
        }
        Decision::Record => {
            debug!(
                "Recording {} {} (mode: {})",
                request.method,
                request.url,
                session.mode()
            );
            Ok(Step::Record)
        }
        Decision::Refuse => {
            warn!(
                "Refusing {} {}: no recorded interaction (mode: {}, blank: {})",
                request.method,
                request.url,
                session.mode(),
                session.was_blank()
            );
            Err(CassetteError::CannotRecord {
                mode: session.mode(),
                method: request.method.clone(),
                url: request.url.clone(),
            })
        }
    }
}

/// Append a fully materialized exchange and return the response
fn record(session: &mut Session, request: Request, response: TransportResponse<Bytes>) -> Response {
    let response = Response {
        version: response.version,
        status: response.status,
        headers: response.headers,
        body: decode_body(&response.body),
    };
    session.append(Interaction::new(request, response.clone()));
    response
}
