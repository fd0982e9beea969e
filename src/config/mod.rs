//! Configuration loading and management
//!
//! Read from `~/.hakstore/config.toml`; every field has a default, so a missing
//! file is the same as an empty one. `HAKSTORE_*` environment variables override
//! file values (container deployments set everything through the environment).

mod io;
mod settings;

pub use settings::{ClientSettings, ServerSettings, WebhookSettings};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::Severity;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub webhooks: WebhookSettings,

    #[serde(default)]
    pub client: ClientSettings,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` (or the global file), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::global_config_path);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!("[hakstore:config] {} not found, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override fields from `HAKSTORE_*` variables.
    ///
    /// `lookup` resolves a variable name; blank values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("HAKSTORE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("HAKSTORE_SERVER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("[hakstore:config] ignoring HAKSTORE_SERVER_PORT={}", port),
            }
        }
        if let Some(database) = get("HAKSTORE_DATABASE") {
            self.server.database = Some(PathBuf::from(database));
        }
        if let Some(base_url) = get("HAKSTORE_BASEURL") {
            self.client.base_url = base_url;
        }
        if let Some(api_key) = get("HAKSTORE_API_KEY") {
            self.client.api_key = api_key;
        }
        for severity in Severity::ALL {
            let name = format!("HAKSTORE_{}_WEBHOOK", severity.as_str().to_uppercase());
            if let Some(url) = get(&name) {
                *self.webhooks.slot_mut(severity) = url;
            }
        }
    }

    /// Database path, falling back to `~/.hakstore/hakstore.db`
    pub fn database_path(&self) -> PathBuf {
        self.server
            .database
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("hakstore.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.workers, 8);
        assert_eq!(config.webhooks.timeout_secs, 10);
        assert!(config.webhooks.url_for(Severity::Critical).is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[webhooks]
high = "https://hooks.slack.com/services/T000/B000/XXX"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.webhooks.url_for(Severity::High),
            Some("https://hooks.slack.com/services/T000/B000/XXX")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HAKSTORE_SERVER_PORT", "7000"),
            ("HAKSTORE_API_KEY", "k-123"),
            ("HAKSTORE_CRITICAL_WEBHOOK", "https://example.com/crit"),
            ("HAKSTORE_LOW_WEBHOOK", "   "),
            ("HAKSTORE_SERVER_HOST", "0.0.0.0"),
        ]);
        let mut config = Config::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:7000");
        assert_eq!(config.client.api_key, "k-123");
        assert_eq!(config.webhooks.url_for(Severity::Critical), Some("https://example.com/crit"));
        assert!(config.webhooks.url_for(Severity::Low).is_none());
    }

    #[test]
    fn test_bad_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|name| (name == "HAKSTORE_SERVER_PORT").then(|| "http".into()));
        assert_eq!(config.server.port, ServerSettings::default().port);
    }
}
