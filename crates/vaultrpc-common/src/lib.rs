//! vaultrpc Common Types and Transport
//!
//! This crate provides the envelope model and the transport seams shared by
//! the vaultrpc receiver (`vaultrpc-server`) and sender (`vaultrpc-client`).
//!
//! # Overview
//!
//! vaultrpc moves opaque, already-encoded application payloads between a
//! caller and a single server-side handler. The pieces that live here:
//!
//! - **Protocol Layer**: [`Request`], [`Response`], error taxonomy, device
//!   and location metadata
//! - **Transport Layer**: codec, `Sender`/`Receiver`/`Handler` traits, HTTP
//!   helpers and the bounded body reader
//! - **Collaborators**: geolocation ([`geo`]) and event logging ([`logging`])
//!
//! # Wire format
//!
//! - **Transport**: HTTP/1.1, `POST` for calls, `OPTIONS` for preflight
//! - **Serialization**: JSON
//! - **Request**: `{"method": "...", "params": ..., "device": {...}}`
//! - **Response**: `{"result": ...}` or `{"error": {"code", "message", "data"}}`
//!
//! # Example
//!
//! ```
//! use vaultrpc_common::{Request, Response};
//! use serde_json::json;
//!
//! let request = Request::new("ping", json!({}));
//! let response = Response::success(json!({"pong": true}));
//! assert_eq!(request.method, "ping");
//! assert!(response.is_success());
//! ```

pub mod geo;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use protocol::*;
