//! Response body materialization

use std::io::Read;

use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::warn;

use crate::{CassetteError, Result};

/// Read a blocking body to the end, up to `max_size` bytes
///
/// # Errors
///
/// Returns `Transport` if reading fails, or `DataTooLarge` if the body
/// exceeds `max_size`
pub fn read_body<R: Read>(body: R, max_size: usize) -> Result<Bytes> {
    let mut data = Vec::new();
    let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
    body.take(limit)
        .read_to_end(&mut data)
        .map_err(|e| CassetteError::Transport(Box::new(e)))?;

    if data.len() > max_size {
        return Err(CassetteError::DataTooLarge {
            size: data.len(),
            limit: max_size,
        });
    }

    Ok(Bytes::from(data))
}

/// Collect a suspending body, up to `max_size` bytes
///
/// # Errors
///
/// Returns `Transport` if the body stream fails, or `DataTooLarge` if the
/// body exceeds `max_size`
pub async fn collect_body<B>(body: B, max_size: usize) -> Result<Bytes>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = body
        .collect()
        .await
        .map_err(|e| CassetteError::Transport(e.into()))?
        .to_bytes();

    if bytes.len() > max_size {
        return Err(CassetteError::DataTooLarge {
            size: bytes.len(),
            limit: max_size,
        });
    }

    Ok(bytes)
}

/// Decode a body as text; invalid UTF-8 is replaced rather than rejected
#[must_use]
pub fn decode_body(bytes: &Bytes) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(
                "Response body is not valid UTF-8 ({e}), storing lossy text of {} bytes",
                bytes.len()
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
