//! HTTP receiver.
//!
//! Binds a TCP listener and serves HTTP/1.1 with one tokio task per
//! connection. Every exchange is delegated to an [`ExchangeRouter`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaultrpc_common::protocol::{Request, Response};
//! use vaultrpc_common::transport::{Handler, Receiver};
//! use vaultrpc_server::{HttpReceiver, ReceiverConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> vaultrpc_common::Result<()> {
//! let handler: Arc<dyn Handler> = Arc::new(|request: Request| async move {
//!     Response::success(request.params)
//! });
//!
//! let receiver = HttpReceiver::bind(ReceiverConfig::new("127.0.0.1:3000".parse().unwrap())).await?;
//! receiver.listen(handler).await
//! # }
//! ```

use async_trait::async_trait;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use vaultrpc_common::geo::{Locate, NoLocation};
use vaultrpc_common::logging::{Logger, VoidLogger};
use vaultrpc_common::protocol::error::{Result, VaultRpcError};
use vaultrpc_common::transport::{Handler, Receiver};

use crate::config::ReceiverConfig;
use crate::http_router::ExchangeRouter;

/// HTTP implementation of [`Receiver`].
pub struct HttpReceiver {
    listener: TcpListener,
    config: ReceiverConfig,
    locator: Arc<dyn Locate>,
    logger: Arc<dyn Logger>,
}

impl HttpReceiver {
    /// Validates `config` and binds its address.
    ///
    /// Binding port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(config: ReceiverConfig) -> Result<Self> {
        config.validate().map_err(VaultRpcError::Transport)?;

        let listener = TcpListener::bind(config.bind_addr).await.map_err(|e| {
            VaultRpcError::Transport(format!("Failed to bind to {}: {}", config.bind_addr, e))
        })?;

        Ok(Self {
            listener,
            config,
            locator: Arc::new(NoLocation),
            logger: Arc::new(VoidLogger::new()),
        })
    }

    pub fn with_locator(mut self, locator: Arc<dyn Locate>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| VaultRpcError::Transport(format!("Failed to get local address: {}", e)))
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }
}

#[async_trait]
impl Receiver for HttpReceiver {
    async fn listen(self, handler: Arc<dyn Handler>) -> Result<()> {
        tracing::info!("HTTP receiver listening on {}", self.local_addr()?);

        let router = Arc::new(
            ExchangeRouter::new(handler, &self.config)
                .with_locator(self.locator)
                .with_logger(self.logger),
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    // EMFILE and friends: back off before retrying.
                    tracing::error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { router.route(req, Some(peer)).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection from {}: {}", peer, err);
                }
            });
        }
    }
}
