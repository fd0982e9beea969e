//! Severity-routed vuln alerts
//!
//! Alerts are handed to a background thread over a channel, so a slow or broken
//! webhook never holds up (or takes down) the request that created the vuln.
//! Each alert is retried with exponential backoff and then dropped with a log line.

mod message;
mod sink;

pub use message::format_alert;
pub use sink::{AlertSink, DeliveryError, WebhookSink};

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::WebhookSettings;
use crate::store::{Severity, Vuln};

/// One queued delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    pub endpoint: String,
    pub text: String,
}

/// Retry schedule: `retries` extra attempts, doubling `base_delay` each time
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// 500 ms, 1 s, 2 s
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1 << retry.min(16))
    }
}

/// Background alert dispatcher
pub struct Notifier {
    routes: WebhookSettings,
    tx: Mutex<Option<Sender<Alert>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Notifier {
    /// Start the delivery thread
    pub fn spawn(sink: Arc<dyn AlertSink>, routes: WebhookSettings, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel::<Alert>();
        let worker = thread::Builder::new()
            .name("hakstore-notifier".into())
            .spawn(move || {
                for alert in rx {
                    deliver_with_retry(sink.as_ref(), &alert, policy);
                }
                tracing::debug!("[hakstore:notify] dispatcher stopped");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("[hakstore:notify] failed to start dispatcher: {}", e);
                None
            }
        };

        Self {
            routes,
            tx: Mutex::new(worker.as_ref().map(|_| tx)),
            worker: Mutex::new(worker),
        }
    }

    /// Webhook sink with the configured timeout and default retries
    pub fn from_settings(routes: WebhookSettings) -> Self {
        let sink = WebhookSink::new(Duration::from_secs(routes.timeout_secs.max(1)));
        Self::spawn(Arc::new(sink), routes, RetryPolicy::default())
    }

    /// Build the alert for `vuln`, or None when its severity has no webhook
    pub fn alert_for(&self, vuln: &Vuln) -> Option<Alert> {
        let endpoint = self.routes.url_for(vuln.severity)?;
        Some(Alert {
            severity: vuln.severity,
            endpoint: endpoint.to_string(),
            text: format_alert(vuln),
        })
    }

    /// Queue an alert for a newly created vuln
    pub fn notify(&self, vuln: &Vuln) {
        let Some(alert) = self.alert_for(vuln) else {
            tracing::debug!(
                "[hakstore:notify] no {} webhook configured, skipping vuln {}",
                vuln.severity.as_str(),
                vuln.id
            );
            return;
        };

        let tx = self.tx.lock().expect("Notifier lock poisoned");
        match tx.as_ref() {
            Some(tx) => {
                if tx.send(alert).is_err() {
                    tracing::warn!("[hakstore:notify] dispatcher gone, dropping alert for vuln {}", vuln.id);
                }
            }
            None => tracing::warn!("[hakstore:notify] dispatcher not running, dropping alert for vuln {}", vuln.id),
        }
    }

    /// Stop accepting alerts and wait until the queued ones are handled
    pub fn shutdown(&self) {
        self.tx.lock().expect("Notifier lock poisoned").take();
        let worker = self.worker.lock().expect("Notifier lock poisoned").take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("[hakstore:notify] dispatcher thread panicked");
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Try once, then retry with backoff. Returns whether delivery succeeded.
pub fn deliver_with_retry(sink: &dyn AlertSink, alert: &Alert, policy: RetryPolicy) -> bool {
    let attempts = policy.retries + 1;
    for attempt in 1..=attempts {
        match sink.deliver(&alert.endpoint, &alert.text) {
            Ok(()) => {
                tracing::debug!(
                    "[hakstore:notify] delivered {} alert (attempt {})",
                    alert.severity.as_str(),
                    attempt
                );
                return true;
            }
            Err(e) => {
                tracing::warn!(
                    "[hakstore:notify] {} alert attempt {}/{} failed: {}",
                    alert.severity.as_str(),
                    attempt,
                    attempts,
                    e
                );
                if attempt < attempts {
                    thread::sleep(policy.delay(attempt - 1));
                }
            }
        }
    }

    tracing::error!(
        "[hakstore:notify] giving up on {} alert after {} attempts",
        alert.severity.as_str(),
        attempts
    );
    false
}
