//! Bounded streaming body reader.
//!
//! Bodies are pulled one frame at a time and the running size is checked
//! after every frame, so an oversized body is rejected as soon as it crosses
//! the limit instead of after it has been buffered.

use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header::{HeaderMap, CONTENT_LENGTH};

use crate::protocol::error::{Result, VaultRpcError};

/// Cap used when the caller does not supply one (10 MB).
pub const DEFAULT_BODY_LIMIT: usize = 10_000_000;

/// Rejects a body whose declared `Content-Length` is already above `limit`.
pub fn check_content_length(headers: &HeaderMap, limit: usize) -> Result<()> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    match declared {
        Some(len) if len > limit => Err(VaultRpcError::MaxRequestSizeExceeded {
            limit,
            received: len,
        }),
        _ => Ok(()),
    }
}

/// Reads a whole body, failing once more than `limit` bytes have arrived.
///
/// `limit` defaults to [`DEFAULT_BODY_LIMIT`]. A body of exactly `limit`
/// bytes is accepted. Trailers are ignored.
pub async fn read_body<B>(mut body: B, limit: Option<usize>) -> Result<Bytes>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let limit = limit.unwrap_or(DEFAULT_BODY_LIMIT);
    let mut buf = BytesMut::new();
    let mut size = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame
            .map_err(|e| VaultRpcError::Transport(format!("Failed to read body: {}", e)))?;

        if let Ok(data) = frame.into_data() {
            size = size.saturating_add(data.len());
            if size > limit {
                tracing::warn!(size, limit, "Max request size exceeded");
                return Err(VaultRpcError::MaxRequestSizeExceeded {
                    limit,
                    received: size,
                });
            }
            buf.extend_from_slice(&data);
        }
    }

    Ok(buf.freeze())
}
