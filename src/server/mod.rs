//! REST API server
//!
//! One `tiny_http::Server` shared by a fixed pool of worker threads; each worker
//! handles one request at a time. Every `/api` path except `/api/health` needs a
//! known `X-API-Key`, checked before the route's handler runs.
//!
//! Routes:
//! - `/api/{platforms,programs,rootdomains,subdomains,ips,vulns}` list / create
//! - `/api/<resource>/{id}` get / update / cascade-delete
//! - `/api/platforms/{id}/programs`, `/api/programs/{id}/{rootdomains,ips,subdomains,vulns}`,
//!   `/api/rootdomains/{id}/subdomains` child listings
//! - `/api/subdomains/recent/{minutes}`, `/api/subdomains/{id}/ips`
//! - `/api/users`, `/api/jobs`, `/api/jobs/{queue}/next`

mod handlers;
pub mod router;
pub mod types;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tiny_http::Server;
use tracing::{debug, error, info, warn};

use crate::auth::{API_KEY_HEADER, KeyCache};
use crate::config::WebhookSettings;
use crate::jobs::{JobQueue, SqliteJobQueue};
use crate::notify::Notifier;
use crate::store::AssetStore;

use handlers::Call;
use router::Route;
use types::{ApiError, read_request_body, respond_json};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Everything a request handler can reach
pub struct ServerState {
    pub store: AssetStore,
    pub keys: KeyCache,
    pub jobs: Arc<dyn JobQueue>,
    pub notifier: Notifier,
}

impl ServerState {
    /// Ensure the admin user exists, load keys, start the notifier
    pub fn bootstrap(store: AssetStore, webhooks: WebhookSettings) -> Result<Self> {
        let admin = store
            .users()
            .ensure_admin()
            .context("Failed to create admin user")?;
        info!("[hakstore:server] Admin API key: {}", admin.key);

        let keys = KeyCache::load(&store.users()).context("Failed to load API keys")?;
        debug!("[hakstore:server] Loaded {} API keys", keys.len());

        let configured = webhooks.configured().count();
        if configured == 0 {
            warn!("[hakstore:server] No webhooks configured, vuln alerts are disabled");
        }

        Ok(Self {
            jobs: Arc::new(SqliteJobQueue::new(store.db().clone())),
            notifier: Notifier::from_settings(webhooks),
            keys,
            store,
        })
    }
}

/// A running server. Drop or `shutdown` to stop it.
pub struct ApiServer {
    addr: SocketAddr,
    server: Arc<Server>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    state: Arc<ServerState>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Stop the workers and flush pending alerts
    pub fn shutdown(mut self) {
        self.stop_workers();
    }

    fn stop_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.stop.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("[hakstore:server] worker thread panicked");
            }
        }
        self.state.notifier.shutdown();
        info!("[hakstore:server] Server on {} stopped", self.addr);
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

/// Bind `bind_addr` and start `workers` request threads
pub fn start_server(state: Arc<ServerState>, bind_addr: &str, workers: usize) -> Result<ApiServer> {
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to start server on {}: {}", bind_addr, e))?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| anyhow!("Server on {} is not bound to a TCP address", bind_addr))?;
    let server = Arc::new(server);
    let stop = Arc::new(AtomicBool::new(false));

    let workers = workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for n in 0..workers {
        let server = Arc::clone(&server);
        let stop = Arc::clone(&stop);
        let state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(format!("hakstore-http-{n}"))
            .spawn(move || worker_loop(&server, &stop, &state))
            .context("Failed to spawn HTTP worker")?;
        handles.push(handle);
    }

    info!(
        "[hakstore:server] Listening on http://{} ({} workers)",
        addr, workers
    );

    Ok(ApiServer {
        addr,
        server,
        stop,
        workers: handles,
        state,
    })
}

fn worker_loop(server: &Server, stop: &AtomicBool, state: &ServerState) {
    while !stop.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handle_request(state, request),
            Ok(None) => {}
            Err(e) => {
                if !stop.load(Ordering::SeqCst) {
                    error!("[hakstore:http] Failed to receive request: {}", e);
                }
                break;
            }
        }
    }
}

fn handle_request(state: &ServerState, mut request: tiny_http::Request) {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(url.as_str()).to_string();

    let Some(route) = Route::parse(&url) else {
        let err = ApiError::not_found(format!("no route for {path}"));
        respond_json(request, err.status, &err.to_json());
        return;
    };

    if !route.is_public() {
        match authorized_user(state, &request) {
            Some(user) => debug!("[hakstore:http] {} {} by {}", method, path, user),
            None => {
                debug!("[hakstore:http] {} {} rejected: bad API key", method, path);
                respond_json(request, 403, &serde_json::json!({ "error": "forbidden" }));
                return;
            }
        }
    }

    let body = if matches!(method.as_str(), "POST" | "PUT") {
        match read_request_body(&mut request) {
            Ok(body) => body,
            Err(err) => {
                respond_json(request, err.status, &err.to_json());
                return;
            }
        }
    } else {
        String::new()
    };

    let query: HashMap<String, String> = router::query_params(&url);
    let call = Call {
        method: &method,
        path: &path,
        body: &body,
        query: &query,
    };

    match handlers::dispatch(state, route, &call) {
        Ok(reply) => respond_json(request, reply.status, &reply.body),
        Err(err) => {
            if err.status >= 500 {
                error!("[hakstore:http] {} {} failed: {}", method, path, err.details);
            } else {
                debug!("[hakstore:http] {} {} -> {} {}", method, path, err.status, err.code);
            }
            respond_json(request, err.status, &err.to_json());
        }
    }
}

/// User id for the request's API key
fn authorized_user(state: &ServerState, request: &tiny_http::Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(API_KEY_HEADER))
        .and_then(|h| state.keys.identify(h.value.as_str()))
}
