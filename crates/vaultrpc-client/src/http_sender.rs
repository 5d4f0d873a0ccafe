//! HTTP(S) sender.
//!
//! One `POST` per call. The scheme of the endpoint picks plain HTTP or TLS;
//! both go through the same pooled hyper-util client.
//!
//! # Failure mapping
//!
//! | Situation                         | Error                          |
//! |-----------------------------------|--------------------------------|
//! | connect/write/read failed         | `Connection` (retryable)       |
//! | deadline passed                   | `Timeout` (retryable)          |
//! | body is not a valid envelope      | `ServerError` with decode data |
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use vaultrpc_client::HttpSender;
//! use vaultrpc_common::protocol::Request;
//! use vaultrpc_common::transport::Sender;
//!
//! # #[tokio::main]
//! # async fn main() -> vaultrpc_common::Result<()> {
//! let sender = HttpSender::new("http://127.0.0.1:3000")?;
//! let response = sender.send(Request::new("ping", json!({}))).await?;
//! println!("{:?}", response.as_result());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use vaultrpc_common::logging::{Logger, VoidLogger};
use vaultrpc_common::protocol::error::{Result, VaultRpcError};
use vaultrpc_common::protocol::{Request, Response};
use vaultrpc_common::transport::{read_body, Codec, JsonCodec, Sender};

use crate::config::SenderConfig;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP implementation of [`Sender`].
#[derive(Clone)]
pub struct HttpSender {
    url: String,
    uri: Uri,
    client: HttpsClient,
    codec: Codec,
    config: SenderConfig,
    logger: Arc<dyn Logger>,
}

impl HttpSender {
    /// Creates a sender for `url` with the default [`SenderConfig`].
    ///
    /// # Errors
    ///
    /// `InvalidUrl` if the URL does not start with `http://` or `https://`,
    /// or cannot be parsed.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(url, SenderConfig::default())
    }

    pub fn with_config(url: impl Into<String>, config: SenderConfig) -> Result<Self> {
        let url = url.into();
        config.validate().map_err(VaultRpcError::Transport)?;
        let uri = parse_endpoint(&url)?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            url,
            uri,
            client,
            codec: Codec::new(),
            config,
            logger: Arc::new(VoidLogger::new()),
        })
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    async fn exchange(&self, body: Vec<u8>) -> Result<Response> {
        let http_request = hyper::Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, JsonCodec::CONTENT_TYPE)
            .header(ACCEPT, JsonCodec::CONTENT_TYPE)
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| VaultRpcError::Transport(format!("Failed to build request: {}", e)))?;

        let response = self.client.request(http_request).await.map_err(|e| {
            VaultRpcError::Connection(format!("Request to {} failed: {}", self.url, e))
        })?;

        let status = response.status();
        let body = read_body(response.into_body(), Some(self.config.max_response_size))
            .await
            .map_err(|e| match e {
                VaultRpcError::Transport(msg) => VaultRpcError::Connection(msg),
                other => other,
            })?;

        self.codec
            .decode_response(&body)
            .map_err(|e| VaultRpcError::ServerError {
                message: format!("Failed to decode response from {}", self.url),
                data: Some(json!({ "error": e.to_string(), "status": status.as_u16() })),
            })
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(&self, request: Request) -> Result<Response> {
        let start = Instant::now();
        let body = self.codec.encode_request(&request)?;

        let timeout = self.config.timeout;
        let result = match tokio::time::timeout(timeout, self.exchange(body)).await {
            Ok(result) => result,
            Err(_) => Err(VaultRpcError::Timeout(timeout.as_millis() as u64)),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            method = %request.method,
            url = %self.url,
            elapsed_ms,
            ok = result.is_ok(),
            "Request finished"
        );
        self.logger.log(
            "rpc.timing",
            Some(json!({
                "method": request.method,
                "url": self.url,
                "elapsedMs": elapsed_ms,
                "ok": result.is_ok(),
            })),
        );

        result
    }
}

fn parse_endpoint(url: &str) -> Result<Uri> {
    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(VaultRpcError::InvalidUrl(format!(
            "'{}' must start with http:// or https://",
            url
        )));
    }

    let uri: Uri = url
        .parse()
        .map_err(|e| VaultRpcError::InvalidUrl(format!("'{}': {}", url, e)))?;
    if uri.host().map_or(true, str::is_empty) {
        return Err(VaultRpcError::InvalidUrl(format!("'{}' has no host", url)));
    }
    Ok(uri)
}
