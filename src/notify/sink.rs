//! Alert delivery endpoints

use std::time::Duration;

use serde::Serialize;

/// Why a delivery attempt failed
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("endpoint did not acknowledge (body: {0:?})")]
    NotAcknowledged(String),
}

/// Something that can carry alert text to an endpoint
pub trait AlertSink: Send + Sync {
    fn deliver(&self, endpoint: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    text: &'a str,
}

/// Incoming-webhook sink: POSTs `{"text": ...}` and expects the body `ok`
pub struct WebhookSink {
    agent: ureq::Agent,
}

impl WebhookSink {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

impl AlertSink for WebhookSink {
    fn deliver(&self, endpoint: &str, text: &str) -> Result<(), DeliveryError> {
        let response = match self
            .agent
            .post(endpoint)
            .set("Content-Type", "application/json")
            .send_json(WebhookBody { text })
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(DeliveryError::Rejected { status, body });
            }
            Err(e) => return Err(DeliveryError::Transport(e.to_string())),
        };

        let body = response
            .into_string()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        if body.trim() != "ok" {
            return Err(DeliveryError::NotAcknowledged(body));
        }
        Ok(())
    }
}
