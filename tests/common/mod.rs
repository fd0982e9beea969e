//! Shared test utilities for store and API integration tests

#![allow(dead_code)]

use std::sync::Arc;

use hakstore::config::WebhookSettings;
use hakstore::server::{ApiServer, ServerState, start_server};
use hakstore::store::{
    AssetStore, NewPlatform, NewProgram, NewRootDomain, NewSubdomain,
};
use tempfile::TempDir;

/// A store backed by a file in a fresh temp dir
pub fn create_test_store() -> (TempDir, AssetStore) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = AssetStore::with_path(&dir.path().join("hakstore.db"))
        .expect("Failed to open test store");
    (dir, store)
}

/// hackerone → tesla → tesla.com → {www, api}.tesla.com
pub fn seed_tesla(store: &AssetStore) {
    store
        .platforms()
        .create(NewPlatform::new("hackerone", "https://hackerone.com"))
        .expect("platform");
    store
        .programs()
        .create(NewProgram::new("tesla", "hackerone"))
        .expect("program");
    store
        .root_domains()
        .create(NewRootDomain::new("tesla.com", "tesla"))
        .expect("rootdomain");
    store
        .subdomains()
        .create_batch(vec![
            NewSubdomain::new("www.tesla.com", "tesla.com"),
            NewSubdomain::new("api.tesla.com", "tesla.com"),
        ])
        .expect("subdomains");
}

/// Rows left in the three edge tables
pub fn edge_count(store: &AssetStore) -> i64 {
    let conn = store.db().conn();
    ["subdomain_ips", "subdomain_vulns", "ip_vulns"]
        .iter()
        .map(|table| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
                r.get::<_, i64>(0)
            })
            .expect("count edges")
        })
        .sum()
}

/// A server on an ephemeral port with no webhooks, plus the admin key
pub struct TestServer {
    pub server: ApiServer,
    pub admin_key: String,
    _dir: TempDir,
}

impl TestServer {
    pub fn start() -> Self {
        let (dir, store) = create_test_store();
        let state = ServerState::bootstrap(store, WebhookSettings::default())
            .expect("Failed to bootstrap server state");
        let admin_key = state.store.users().ensure_admin().expect("admin").key;
        let server =
            start_server(Arc::new(state), "127.0.0.1:0", 2).expect("Failed to start server");
        Self {
            server,
            admin_key,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.base_url(), path)
    }

    pub fn client(&self) -> hakstore::client::ApiClient {
        hakstore::client::ApiClient::new(self.server.base_url(), &self.admin_key)
    }
}
