//! Settings sections of `config.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::Severity;

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of request worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// SQLite database path (default: ~/.hakstore/hakstore.db)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

/// `[webhooks]` section: one alert endpoint per severity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub critical: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub informational: String,

    /// Per-delivery timeout
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

/// `[client]` section used by the CLI commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL of a running hakstore server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `X-API-Key`
    #[serde(default)]
    pub api_key: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8484
}

fn default_workers() -> usize {
    8
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_base_url() -> String {
    format!("http://{}:{}", default_host(), default_port())
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            database: None,
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            critical: String::new(),
            high: String::new(),
            medium: String::new(),
            low: String::new(),
            informational: String::new(),
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

impl ServerSettings {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl WebhookSettings {
    /// Endpoint for a severity, if one is configured
    pub fn url_for(&self, severity: Severity) -> Option<&str> {
        let url = match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Informational => &self.informational,
        };
        let url = url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Severities that have an endpoint
    pub fn configured(&self) -> impl Iterator<Item = Severity> + '_ {
        Severity::ALL
            .into_iter()
            .filter(|s| self.url_for(*s).is_some())
    }

    pub(super) fn slot_mut(&mut self, severity: Severity) -> &mut String {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Informational => &mut self.informational,
        }
    }
}
