//! HTTP Transport Utilities
//!
//! Helpers shared by the HTTP receiver and sender.
//!
//! # Wire contract
//!
//! - `OPTIONS` answers with CORS headers and no body
//! - `POST` carries an encoded request and always answers `200` with an
//!   encoded response, application errors included
//! - anything else answers `405`
//!
//! Every response carries the same CORS headers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use std::net::SocketAddr;

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "OPTIONS, POST";
pub const ALLOW_HEADERS: &str = "Content-Type";
pub const RESPONSE_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Response to an `OPTIONS` probe: CORS headers, empty body.
    pub fn preflight() -> HyperResponse {
        Self::empty(StatusCode::OK)
    }

    /// Response to any verb other than `OPTIONS` and `POST`.
    pub fn method_not_allowed() -> HyperResponse {
        Self::empty(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// Wraps an encoded response body.
    ///
    /// Content type and length are always set explicitly.
    pub fn to_http_response(body: Vec<u8>) -> HyperResponse {
        let len = body.len();
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        Self::apply_cors(headers);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(RESPONSE_CONTENT_TYPE));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        response
    }

    /// Adds the access-control headers every response carries.
    pub fn apply_cors(headers: &mut HeaderMap) {
        headers.insert(
            "access-control-allow-origin",
            HeaderValue::from_static(ALLOW_ORIGIN),
        );
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            "access-control-allow-headers",
            HeaderValue::from_static(ALLOW_HEADERS),
        );
    }

    /// Resolves the caller's IP address.
    ///
    /// The first entry of `X-Forwarded-For` wins; without one the socket
    /// peer address is used.
    pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        let forwarded = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .find(|entry| !entry.is_empty());

        match forwarded {
            Some(ip) => Some(ip.to_string()),
            None => peer.map(|addr| addr.ip().to_string()),
        }
    }

    fn empty(status: StatusCode) -> HyperResponse {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        Self::apply_cors(headers);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(0usize));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers.get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(
            headers.get("Access-Control-Allow-Methods").unwrap(),
            "OPTIONS, POST"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type"
        );
    }

    #[test]
    fn test_preflight_response() {
        let response = HttpTransport::preflight();
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(response.headers());
        assert_eq!(response.headers().get("Content-Length").unwrap(), "0");
    }

    #[test]
    fn test_method_not_allowed_response() {
        let response = HttpTransport::method_not_allowed();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(response.headers());
    }

    #[test]
    fn test_to_http_response_headers() {
        let body = br#"{"result":{"pong":true}}"#.to_vec();
        let response = HttpTransport::to_http_response(body.clone());

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(response.headers());
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json; charset=utf-8"
        );
        assert_eq!(
            response.headers().get("Content-Length").unwrap(),
            &body.len().to_string()
        );
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4, 5.6.7.8"));
        let peer: SocketAddr = "10.0.0.9:5000".parse().unwrap();

        assert_eq!(
            HttpTransport::client_ip(&headers, Some(peer)),
            Some("1.2.3.4".to_string())
        );
    }

    #[test]
    fn test_client_ip_uses_first_of_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("9.9.9.9"));
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("8.8.8.8"));

        assert_eq!(
            HttpTransport::client_ip(&headers, None),
            Some("9.9.9.9".to_string())
        );
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:4242".parse().unwrap();
        assert_eq!(
            HttpTransport::client_ip(&headers, Some(peer)),
            Some("127.0.0.1".to_string())
        );
    }

    #[test]
    fn test_client_ip_ignores_blank_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" , "));
        let peer: SocketAddr = "[::1]:4242".parse().unwrap();
        assert_eq!(
            HttpTransport::client_ip(&headers, Some(peer)),
            Some("::1".to_string())
        );
    }

    #[test]
    fn test_client_ip_unknown() {
        assert_eq!(HttpTransport::client_ip(&HeaderMap::new(), None), None);
    }
}
