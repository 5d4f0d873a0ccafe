//! vaultrpc Transport Layer
//!
//! This module defines the pluggable transport seams and the pieces shared by
//! every HTTP binding.
//!
//! # Components
//!
//! - **[`Sender`]**: client egress, `send(Request) -> Response`
//! - **[`Receiver`]**: server ingress, `listen(handler)`
//! - **[`Handler`]**: the single point where application logic runs
//! - **[`Codec`]** / **[`JsonCodec`]**: encode/decode envelopes
//! - **[`HttpTransport`]**: CORS, routing responses, client IP resolution
//! - **[`read_body`]**: size-bounded streaming body reader

pub mod body;
pub mod codec;
pub mod http;

pub use body::{check_content_length, read_body, DEFAULT_BODY_LIMIT};
pub use codec::{Codec, JsonCodec};
pub use http::{HttpTransport, HyperRequest, HyperResponse};

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::protocol::error::Result;
use crate::protocol::{Request, Response};

/// Application logic behind a receiver.
///
/// Handlers report their own failures as error responses; the transport
/// passes them through untouched.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Response;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn handle(&self, request: Request) -> Response {
        (self)(request).await
    }
}

/// Client side of the transport.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Delivers one request and waits for its response.
    ///
    /// Network failures are returned as errors, never panics, so callers can
    /// retry uniformly.
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Server side of the transport.
#[async_trait]
pub trait Receiver: Send {
    /// Serves requests with `handler` until the process shuts down.
    async fn listen(self, handler: Arc<dyn Handler>) -> Result<()>;
}
