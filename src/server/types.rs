//! Request/response plumbing shared by the API handlers

use std::io::Read;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tiny_http::{Header, Response};

use crate::store::{OneOrMany, StoreError};

pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024; // 2 MiB

/// Successful handler outcome
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: impl Serialize) -> Result<Self, ApiError> {
        Ok(Self {
            status: 200,
            body: serde_json::to_value(body).map_err(ApiError::from_serialize)?,
        })
    }

    /// Single object for a single-object request, array for a batch
    pub fn mirror<T: Serialize>(batch: bool, mut items: Vec<T>) -> Result<Self, ApiError> {
        if batch {
            return Self::ok(items);
        }
        match items.pop() {
            Some(item) => Self::ok(item),
            None => Err(ApiError::bad_request("invalid_input", "empty request")),
        }
    }
}

/// Error answered as `{"error": code, "details": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub code: &'static str,
    pub details: String,
}

impl ApiError {
    pub fn new(status: u16, code: &'static str, details: impl Into<String>) -> Self {
        Self {
            status,
            code,
            details: details.into(),
        }
    }

    pub fn bad_request(code: &'static str, details: impl Into<String>) -> Self {
        Self::new(400, code, details)
    }

    pub fn not_found(details: impl Into<String>) -> Self {
        Self::new(404, "not_found", details)
    }

    pub fn method_not_allowed(method: &str, path: &str) -> Self {
        Self::new(405, "method_not_allowed", format!("{method} {path}"))
    }

    fn from_serialize(e: serde_json::Error) -> Self {
        Self::new(500, "store_error", format!("failed to serialize response: {e}"))
    }

    pub fn to_json(&self) -> Value {
        json!({ "error": self.code, "details": self.details })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound { .. } => 404,
            StoreError::Invalid(_) => 400,
            StoreError::Cascade { .. } | StoreError::Sqlite(_) | StoreError::Json(_) => 500,
        };
        Self::new(status, e.code(), e.to_string())
    }
}

/// Parse a JSON body
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::bad_request("invalid_json", e.to_string()))
}

/// Parse a body that holds one record or an array of records
pub fn decode_batch<T: DeserializeOwned>(body: &str) -> Result<(bool, Vec<T>), ApiError> {
    let parsed: OneOrMany<T> = decode(body)?;
    let batch = parsed.is_batch();
    let items = parsed.into_vec();
    if items.is_empty() {
        return Err(ApiError::bad_request("invalid_input", "empty batch"));
    }
    Ok((batch, items))
}

pub fn json_content_type() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid")
}

pub fn read_request_body(request: &mut tiny_http::Request) -> Result<String, ApiError> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        tracing::error!("[hakstore:http] Failed to read body: {}", e);
        return Err(ApiError::bad_request("bad_request", e.to_string()));
    }

    if body.len() > MAX_BODY_BYTES {
        return Err(ApiError::new(
            413,
            "payload_too_large",
            format!("body exceeds {MAX_BODY_BYTES} bytes"),
        ));
    }

    Ok(body)
}

pub fn respond_json(request: tiny_http::Request, status_code: u16, value: &Value) {
    let body =
        serde_json::to_string(value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    if let Err(e) = request.respond(response) {
        tracing::debug!("[hakstore:http] client went away: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityKind, NewPlatform, NodeRef};

    #[test]
    fn test_store_errors_map_to_status() {
        let not_found: ApiError = StoreError::not_found(EntityKind::Program, "tesla").into();
        assert_eq!(not_found.status, 404);
        assert_eq!(not_found.to_json()["error"], "not_found");

        let invalid: ApiError = StoreError::invalid("severity must be 1-5").into();
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.code, "invalid_input");

        let cascade: ApiError = StoreError::Cascade {
            root: NodeRef::Platform("hackerone".into()),
            reached: NodeRef::RootDomain("tesla.com".into()),
            source: Box::new(StoreError::invalid("boom")),
        }
        .into();
        assert_eq!(cascade.status, 500);
        assert_eq!(cascade.code, "store_error");
        assert!(cascade.details.contains("rootdomain:tesla.com"), "{}", cascade.details);
    }

    #[test]
    fn test_decode_batch_shapes() {
        let (batch, items) = decode_batch::<NewPlatform>(r#"{"id":"h1"}"#).unwrap();
        assert!(!batch);
        assert_eq!(items.len(), 1);

        let (batch, items) = decode_batch::<NewPlatform>(r#"[{"id":"a"},{"id":"b"}]"#).unwrap();
        assert!(batch);
        assert_eq!(items.len(), 2);

        assert_eq!(decode_batch::<NewPlatform>("[]").unwrap_err().status, 400);
        assert_eq!(decode_batch::<NewPlatform>("{oops").unwrap_err().code, "invalid_json");
    }

    #[test]
    fn test_mirror() {
        assert!(Reply::mirror(true, vec![1, 2]).unwrap().body.is_array());
        assert_eq!(Reply::mirror(false, vec![5]).unwrap().body, json!(5));
    }
}
