//! vaultrpc Server
//!
//! HTTP receiver for vaultrpc. Accepts `POST` envelopes, bounds their size,
//! stamps the caller's IP and location onto each request, and hands it to a
//! [`Handler`](vaultrpc_common::transport::Handler).

pub mod config;
pub mod http_receiver;
pub mod http_router;

pub use config::ReceiverConfig;
pub use http_receiver::HttpReceiver;
pub use http_router::ExchangeRouter;
