//! Per-exchange routing for the HTTP receiver.
//!
//! # Architecture
//!
//! Each inbound HTTP request goes through the same pipeline:
//!
//! 1. **Routing**: `OPTIONS` → preflight, `POST` → call, anything else → `405`
//! 2. **Bounded read**: the body is pulled frame by frame against the size cap
//! 3. **Decode**: the body becomes a [`Request`]; failures are answered with a
//!    `malformed_payload` error response
//! 4. **Enrichment**: caller IP and location are assigned
//! 5. **Dispatch**: the handler is invoked exactly once on its own task,
//!    awaited to completion, and its response is encoded for the caller's
//!    client version
//!
//! A size violation is returned as an `Err`, which makes hyper drop the
//! connection without writing a response.

use bytes::Bytes;
use hyper::body::Body;
use hyper::header::HeaderMap;
use hyper::Method;
use serde_json::json;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vaultrpc_common::geo::{Locate, NoLocation};
use vaultrpc_common::logging::{Logger, VoidLogger};
use vaultrpc_common::protocol::error::{Result, VaultRpcError};
use vaultrpc_common::protocol::{ClientVersion, Location, Request, Response};
use vaultrpc_common::transport::{
    check_content_length, read_body, Codec, Handler, HttpTransport, HyperResponse,
};

use crate::config::ReceiverConfig;

/// Turns inbound HTTP requests into handler calls.
pub struct ExchangeRouter {
    handler: Arc<dyn Handler>,
    locator: Arc<dyn Locate>,
    logger: Arc<dyn Logger>,
    codec: Codec,
    max_request_size: usize,
    geo_lookup_timeout: Duration,
}

impl ExchangeRouter {
    /// Creates a router with no geolocation and no event logging.
    pub fn new(handler: Arc<dyn Handler>, config: &ReceiverConfig) -> Self {
        Self {
            handler,
            locator: Arc::new(NoLocation),
            logger: Arc::new(VoidLogger::new()),
            codec: Codec::new(),
            max_request_size: config.max_request_size,
            geo_lookup_timeout: config.geo_lookup_timeout,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn Locate>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Handles one HTTP exchange.
    ///
    /// # Returns
    ///
    /// - `Ok(response)` for every routed, decoded or rejected-by-decode request
    /// - `Err(MaxRequestSizeExceeded)` or a body read error when the
    ///   connection has to be torn down
    pub async fn route<B>(
        &self,
        req: hyper::Request<B>,
        peer: Option<SocketAddr>,
    ) -> Result<HyperResponse>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        match *req.method() {
            Method::OPTIONS => Ok(HttpTransport::preflight()),
            Method::POST => self.call(req, peer).await,
            ref other => {
                tracing::debug!("Rejecting {} request", other);
                Ok(HttpTransport::method_not_allowed())
            }
        }
    }

    async fn call<B>(&self, req: hyper::Request<B>, peer: Option<SocketAddr>) -> Result<HyperResponse>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let start = Instant::now();
        let (parts, body) = req.into_parts();

        let body = match check_content_length(&parts.headers, self.max_request_size) {
            Ok(()) => read_body(body, Some(self.max_request_size)).await,
            Err(e) => Err(e),
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                if let VaultRpcError::MaxRequestSizeExceeded { limit, received } = &e {
                    self.logger.log(
                        "rpc.max_request_size_exceeded",
                        Some(json!({ "limit": limit, "received": received })),
                    );
                }
                return Err(e);
            }
        };

        let mut request = match self.codec.decode_request(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Failed to decode request: {}", e);
                self.logger
                    .log("rpc.malformed_payload", Some(json!({ "error": e.to_string() })));
                return self.respond(&Response::from(e), None);
            }
        };

        self.enrich(&mut request, &parts.headers, peer).await;

        let client_version = request.client_version();
        let method = request.method.clone();
        let response = self.dispatch(request).await;

        tracing::debug!(
            method = %method,
            success = response.is_success(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );

        self.respond(&response, client_version)
    }

    /// Runs the handler on its own task.
    ///
    /// Hyper drops the service future when the peer goes away; the handler
    /// task keeps running to completion regardless.
    async fn dispatch(&self, request: Request) -> Response {
        let handler = self.handler.clone();
        let method = request.method.clone();
        match tokio::spawn(async move { handler.handle(request).await }).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Handler for {} failed: {}", method, e);
                Response::from(VaultRpcError::ServerError {
                    message: format!("Handler for {} failed", method),
                    data: None,
                })
            }
        }
    }

    /// Assigns the receiver-owned fields of a request.
    ///
    /// Whatever the payload carried is overwritten. Never fails: a missing
    /// IP or a failed lookup simply leaves `location` empty.
    pub async fn enrich(&self, request: &mut Request, headers: &HeaderMap, peer: Option<SocketAddr>) {
        request.ip_address = HttpTransport::client_ip(headers, peer);

        let ip = request
            .ip_address
            .as_deref()
            .and_then(|ip| ip.parse::<IpAddr>().ok());
        request.location = match ip {
            Some(ip) => self.lookup(ip).await,
            None => None,
        };
    }

    async fn lookup(&self, ip: IpAddr) -> Option<Location> {
        match tokio::time::timeout(self.geo_lookup_timeout, self.locator.locate(ip)).await {
            Ok(Ok(location)) => location.filter(|location| !location.is_empty()),
            Ok(Err(e)) => {
                tracing::debug!("Geolocation lookup for {} failed: {}", ip, e);
                None
            }
            Err(_) => {
                tracing::debug!("Geolocation lookup for {} timed out", ip);
                None
            }
        }
    }

    fn respond(&self, response: &Response, client_version: Option<ClientVersion>) -> Result<HyperResponse> {
        let body = self.codec.encode_response_for(response, client_version)?;
        Ok(HttpTransport::to_http_response(body))
    }
}
