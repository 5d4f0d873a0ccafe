//! vaultrpc Client
//!
//! [`HttpSender`] delivers envelopes to a receiver over HTTP or HTTPS and
//! turns transport failures into retryable [`VaultRpcError`]s.
//!
//! [`VaultRpcError`]: vaultrpc_common::VaultRpcError

pub mod config;
pub mod http_sender;

pub use config::SenderConfig;
pub use http_sender::HttpSender;
