//! HTTP Sender Integration Tests
//!
//! These tests run the sender against small hyper servers that answer with
//! canned bodies, so every failure mode can be produced on demand.
//!
//! All URLs use `http://127.0.0.1:PORT` with an ephemeral port.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HttpRequest, Response as HttpResponse, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use vaultrpc_client::{HttpSender, SenderConfig};
use vaultrpc_common::logging::{LogContext, LogEvent, Logger};
use vaultrpc_common::protocol::{ErrorCode, Request, Response};
use vaultrpc_common::transport::Sender;
use vaultrpc_common::VaultRpcError;

/// Test server that answers every request through `respond`
struct TestServer {
    addr: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn start<F, Fut>(respond: F) -> Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse<Full<Bytes>>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let respond = Arc::new(respond);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let respond = respond.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req: HttpRequest<Incoming>| {
                                let respond = respond.clone();
                                async move {
                                    let body = req.into_body().collect().await.unwrap().to_bytes();
                                    Ok::<_, Infallible>(respond(body).await)
                                }
                            });
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Server that echoes `params` back as the result
    async fn echo() -> Self {
        Self::start(|body| async move {
            let request: Value = serde_json::from_slice(&body).unwrap();
            json_response(&json!({ "result": request["params"] }))
        })
        .await
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn json_response(body: &Value) -> HttpResponse<Full<Bytes>> {
    raw_response(StatusCode::OK, serde_json::to_vec(body).unwrap())
}

fn raw_response(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse<Full<Bytes>> {
    HttpResponse::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(body.into()))
        .unwrap()
}

/// Logger that keeps every event
#[derive(Default, Clone)]
struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl Logger for RecordingLogger {
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent {
        let event = LogEvent::new(kind, data, None);
        self.events.lock().unwrap().push(event.clone());
        event
    }

    fn with_context(&self, _context: LogContext) -> Arc<dyn Logger> {
        Arc::new(self.clone())
    }
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[tokio::test]
async fn test_send_echo() {
    let server = TestServer::echo().await;
    let sender = HttpSender::new(server.base_url()).unwrap();

    let params = json!({"vault": "personal", "items": [1, 2, 3]});
    let response = sender.send(Request::new("echo", params.clone())).await.unwrap();

    assert_eq!(response, Response::success(params));
}

#[tokio::test]
async fn test_send_sets_json_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let seen_tx = Arc::new(Mutex::new(Some(seen_tx)));
        let service = service_fn(move |req: HttpRequest<Incoming>| {
            let seen_tx = seen_tx.clone();
            async move {
                let headers = (
                    req.method().clone(),
                    req.headers().get("content-type").cloned(),
                    req.headers().get("accept").cloned(),
                );
                if let Some(tx) = seen_tx.lock().unwrap().take() {
                    let _ = tx.send(headers);
                }
                Ok::<_, Infallible>(json_response(&json!({"result": null})))
            }
        });
        let _ = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .await;
    });

    let sender = HttpSender::new(base_url).unwrap();
    let response = sender.send(Request::new("ping", json!({}))).await.unwrap();
    assert_eq!(response, Response::success(Value::Null));

    let (method, content_type, accept) = seen_rx.await.unwrap();
    assert_eq!(method, hyper::Method::POST);
    assert_eq!(content_type.unwrap(), "application/json");
    assert_eq!(accept.unwrap(), "application/json");
}

#[tokio::test]
async fn test_application_error_is_a_response() {
    let server = TestServer::start(|_| async {
        json_response(&json!({
            "error": {"code": "vault_locked", "message": "Vault is locked", "data": {"retryAfter": 30}}
        }))
    })
    .await;
    let sender = HttpSender::new(server.base_url()).unwrap();

    let response = sender.send(Request::new("open", json!({}))).await.unwrap();
    let error = response.as_error().unwrap();
    assert_eq!(error.code, ErrorCode::Application("vault_locked".to_string()));
    assert_eq!(error.data, Some(json!({"retryAfter": 30})));
}

#[tokio::test]
async fn test_concurrent_sends_share_client() {
    let server = TestServer::echo().await;
    let sender = HttpSender::new(server.base_url()).unwrap();
    let sender2 = sender.clone();

    let (first, second) = tokio::join!(
        sender.send(Request::new("echo", json!({"n": 1}))),
        sender2.send(Request::new("echo", json!({"n": 2})))
    );

    assert_eq!(first.unwrap(), Response::success(json!({"n": 1})));
    assert_eq!(second.unwrap(), Response::success(json!({"n": 2})));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_unreachable_server_is_retryable_failed_connection() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sender = HttpSender::new(format!("http://{}", addr)).unwrap();
    let err = sender.send(Request::new("ping", json!({}))).await.unwrap_err();

    assert!(matches!(err, VaultRpcError::Connection(_)), "got {:?}", err);
    assert_eq!(err.code(), ErrorCode::FailedConnection);
    assert!(err.is_retryable());
    assert!(err.code().is_server_class());
}

#[tokio::test]
async fn test_non_json_body_is_server_error() {
    let server = TestServer::start(|_| async {
        raw_response(StatusCode::BAD_GATEWAY, "<html>502 Bad Gateway</html>")
    })
    .await;
    let sender = HttpSender::new(server.base_url()).unwrap();

    let err = sender.send(Request::new("ping", json!({}))).await.unwrap_err();
    match &err {
        VaultRpcError::ServerError { data: Some(data), .. } => {
            assert_eq!(data["status"], 502);
            assert!(data["error"].is_string());
        }
        other => panic!("expected ServerError, got {:?}", other),
    }
    assert_eq!(err.code(), ErrorCode::ServerError);
    assert!(!err.is_retryable());

    let wire = Response::from(err);
    assert_eq!(wire.as_error().unwrap().data.as_ref().unwrap()["status"], 502);
}

#[tokio::test]
async fn test_envelope_with_both_fields_is_server_error() {
    let server = TestServer::start(|_| async {
        json_response(&json!({"result": 1, "error": {"code": "x", "message": "y"}}))
    })
    .await;
    let sender = HttpSender::new(server.base_url()).unwrap();

    let err = sender.send(Request::new("ping", json!({}))).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ServerError);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = TestServer::start(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        json_response(&json!({"result": null}))
    })
    .await;
    let config = SenderConfig::new().with_timeout(Duration::from_millis(100));
    let sender = HttpSender::with_config(server.base_url(), config).unwrap();

    let err = sender.send(Request::new("ping", json!({}))).await.unwrap_err();
    assert!(matches!(err, VaultRpcError::Timeout(100)), "got {:?}", err);
    assert_eq!(err.code(), ErrorCode::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let server = TestServer::start(|_| async {
        json_response(&json!({"result": "x".repeat(4096)}))
    })
    .await;
    let config = SenderConfig::new().with_max_response_size(1024);
    let sender = HttpSender::with_config(server.base_url(), config).unwrap();

    let err = sender.send(Request::new("ping", json!({}))).await.unwrap_err();
    assert!(matches!(err, VaultRpcError::MaxRequestSizeExceeded { limit: 1024, .. }));
}

#[tokio::test]
async fn test_invalid_url_rejected() {
    for url in ["127.0.0.1:3000", "tcp://127.0.0.1:3000", "not a url"] {
        match HttpSender::new(url) {
            Err(VaultRpcError::InvalidUrl(_)) => {}
            Err(other) => panic!("expected InvalidUrl for {}, got {:?}", url, other),
            Ok(_) => panic!("{} must be rejected", url),
        }
    }
}

// ============================================================================
// Logging Tests
// ============================================================================

#[tokio::test]
async fn test_timing_event_logged() {
    let server = TestServer::echo().await;
    let logger = RecordingLogger::default();
    let sender = HttpSender::new(server.base_url())
        .unwrap()
        .with_logger(Arc::new(logger.clone()));

    sender.send(Request::new("echo", json!({}))).await.unwrap();

    let events = logger.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "rpc.timing");
    let data = events[0].data.as_ref().unwrap();
    assert_eq!(data["method"], "echo");
    assert_eq!(data["ok"], true);
    assert!(data["elapsedMs"].is_u64());
}

#[tokio::test]
async fn test_timing_event_logged_on_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let logger = RecordingLogger::default();
    let sender = HttpSender::new(format!("http://{}", addr))
        .unwrap()
        .with_logger(Arc::new(logger.clone()));

    assert!(sender.send(Request::new("ping", json!({}))).await.is_err());

    let events = logger.events.lock().unwrap();
    assert_eq!(events[0].data.as_ref().unwrap()["ok"], false);
}
