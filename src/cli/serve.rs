//! Serve command implementation

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use hakstore::config::Config;
use hakstore::server::{ServerState, start_server};
use hakstore::store::AssetStore;

/// Command-line values that win over the config file
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
    pub database: Option<PathBuf>,
}

impl ServeOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(workers) = self.workers {
            config.server.workers = workers;
        }
        if let Some(database) = self.database {
            config.server.database = Some(database);
        }
    }
}

pub async fn serve_command(mut config: Config, overrides: ServeOverrides) -> Result<()> {
    overrides.apply(&mut config);

    let db_path = config.database_path();
    let store = AssetStore::with_path(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("[hakstore:server] Using database {}", db_path.display());

    let state = Arc::new(ServerState::bootstrap(store, config.webhooks.clone())?);
    let server = start_server(state, &config.server.bind_addr(), config.server.workers)?;

    println!("hakstore listening on {}", server.base_url());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("[hakstore:server] Shutting down");
    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .context("Server shutdown task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        ServeOverrides {
            port: Some(9000),
            database: Some(PathBuf::from("/tmp/h.db")),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/h.db"));
    }
}
