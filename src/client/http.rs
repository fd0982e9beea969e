//! ureq plumbing for the API client

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::auth::API_KEY_HEADER;

/// Turn an error response into one readable line
pub(super) fn format_http_error(code: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {code}");
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return format!("HTTP {code}: {body}");
    };

    let error = value
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("http_error");
    let details = value
        .get("details")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    match details {
        Some(details) => format!("HTTP {code} {error}: {details}"),
        None => format!("HTTP {code} {error}"),
    }
}

/// Percent-encode an id for use as one path segment
pub(super) fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub(super) fn with_key(req: ureq::Request, key: &str) -> ureq::Request {
    let key = key.trim();
    if key.is_empty() {
        return req;
    }
    req.set(API_KEY_HEADER, key)
}

/// Send `req` (with an optional JSON body) and parse the JSON answer
pub(super) fn send<T: DeserializeOwned>(
    req: ureq::Request,
    body: Option<&serde_json::Value>,
) -> Result<T> {
    let result = match body {
        Some(body) => req
            .set("Content-Type", "application/json")
            .send_string(&serde_json::to_string(body).context("Failed to serialize request JSON")?),
        None => req.call(),
    };

    let resp = result.map_err(|e| match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            anyhow::anyhow!(format_http_error(code, &body))
        }
        other => anyhow::anyhow!(other),
    })?;

    let body = resp.into_string().context("Failed to read response body")?;
    serde_json::from_str(&body).context("Failed to parse JSON response")
}
