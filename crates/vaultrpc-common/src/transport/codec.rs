use crate::protocol::error::{Result, VaultRpcError};
use crate::protocol::{ClientVersion, Request, Response};

/// Codec for encoding/decoding envelopes
///
/// Currently only JSON is supported, but the enum allows for future
/// extensibility (e.g., MessagePack, CBOR, etc.).
///
/// # Example
///
/// ```
/// use vaultrpc_common::transport::Codec;
/// use vaultrpc_common::protocol::Request;
/// use serde_json::json;
///
/// let codec = Codec::new();
/// let request = Request::new("ping", json!({}));
///
/// let encoded = codec.encode_request(&request).unwrap();
/// let decoded = codec.decode_request(&encoded).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    /// JSON codec (currently the only supported format)
    Json(JsonCodec),
}

impl Codec {
    /// Create a new codec (JSON is the only supported format)
    pub fn new() -> Self {
        Codec::Json(JsonCodec)
    }

    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>> {
        match self {
            Codec::Json(_) => JsonCodec::encode_request(request),
        }
    }

    pub fn decode_request(&self, data: &[u8]) -> Result<Request> {
        match self {
            Codec::Json(_) => JsonCodec::decode_request(data),
        }
    }

    pub fn encode_response(&self, response: &Response) -> Result<Vec<u8>> {
        match self {
            Codec::Json(_) => JsonCodec::encode_response(response),
        }
    }

    pub fn encode_response_for(
        &self,
        response: &Response,
        client_version: Option<ClientVersion>,
    ) -> Result<Vec<u8>> {
        match self {
            Codec::Json(_) => JsonCodec::encode_response_for(response, client_version),
        }
    }

    pub fn decode_response(&self, data: &[u8]) -> Result<Response> {
        match self {
            Codec::Json(_) => JsonCodec::decode_response(data),
        }
    }

    /// MIME type written alongside encoded bodies.
    pub fn content_type(&self) -> &'static str {
        match self {
            Codec::Json(_) => JsonCodec::CONTENT_TYPE,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON codec for encoding/decoding envelopes
///
/// Decoding is lenient about shape (unknown fields are ignored, optional
/// fields default) and strict about content: any failure is reported as
/// [`VaultRpcError::MalformedPayload`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const CONTENT_TYPE: &'static str = "application/json";

    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decode a request from bytes
    ///
    /// Rejects requests whose `method` is empty.
    pub fn decode_request(data: &[u8]) -> Result<Request> {
        let request: Request = serde_json::from_slice(data)?;
        if request.method.is_empty() {
            return Err(VaultRpcError::MalformedPayload(
                "request method must not be empty".to_string(),
            ));
        }
        Ok(request)
    }

    pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    /// Encode a response shaped for the given client version
    pub fn encode_response_for(
        response: &Response,
        client_version: Option<ClientVersion>,
    ) -> Result<Vec<u8>> {
        Self::encode_response(&response.to_wire(client_version))
    }

    pub fn decode_response(data: &[u8]) -> Result<Response> {
        Ok(serde_json::from_slice(data)?)
    }
}
