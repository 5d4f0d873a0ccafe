//! Handler served by `vaultrpc serve`.
//!
//! | Method   | Result                                       |
//! |----------|----------------------------------------------|
//! | `ping`   | `{"pong": true}`                             |
//! | `echo`   | the request params                           |
//! | `whoami` | `{"ipAddress", "location", "clientVersion"}` |
//!
//! Anything else yields a `method_not_found` error response.

use async_trait::async_trait;
use serde_json::json;

use vaultrpc_common::protocol::{Request, Response};
use vaultrpc_common::transport::Handler;

/// Error code returned for unknown methods.
pub const METHOD_NOT_FOUND: &str = "method_not_found";

#[derive(Debug, Clone, Copy, Default)]
pub struct DemoHandler;

#[async_trait]
impl Handler for DemoHandler {
    async fn handle(&self, request: Request) -> Response {
        match request.method.as_str() {
            "ping" => Response::success(json!({ "pong": true })),
            "echo" => Response::success(request.params),
            "whoami" => Response::success(json!({
                "ipAddress": request.ip_address,
                "location": request.location,
                "clientVersion": request.client_version().map(|v| v.to_string()),
            })),
            other => {
                tracing::debug!("Unknown method: {}", other);
                Response::error(METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        }
    }
}
