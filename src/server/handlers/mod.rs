//! Request handlers for the `/api` surface
//!
//! Each handler gets the resolved route plus the request's method, body and query,
//! and returns a `Reply` or an `ApiError`. Handlers never touch the socket.

mod access;
mod assets;
mod hierarchy;
mod subdomains;

use std::collections::HashMap;

use serde_json::json;

use super::ServerState;
use super::router::Route;
use super::types::{ApiError, Reply};

/// The parts of a request a handler looks at
pub struct Call<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a str,
    pub query: &'a HashMap<String, String>,
}

impl Call<'_> {
    /// Reject anything but `allowed`
    pub fn only(&self, allowed: &str) -> Result<(), ApiError> {
        if self.method == allowed {
            Ok(())
        } else {
            Err(self.not_allowed())
        }
    }

    pub fn not_allowed(&self) -> ApiError {
        ApiError::method_not_allowed(self.method, self.path)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

pub fn dispatch(state: &ServerState, route: Route, call: &Call) -> Result<Reply, ApiError> {
    match route {
        Route::Health => {
            call.only("GET")?;
            Reply::ok(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            }))
        }

        Route::Platforms => hierarchy::platforms(state, call),
        Route::Platform(id) => hierarchy::platform(state, &id, call),
        Route::PlatformPrograms(id) => {
            call.only("GET")?;
            Reply::ok(state.store.platforms().programs(&id)?)
        }

        Route::Programs => hierarchy::programs(state, call),
        Route::Program(id) => hierarchy::program(state, &id, call),
        Route::ProgramChildren(id, child) => hierarchy::program_children(state, &id, child, call),

        Route::RootDomains => hierarchy::root_domains(state, call),
        Route::RootDomain(id) => hierarchy::root_domain(state, &id, call),
        Route::RootDomainSubdomains(id) => {
            call.only("GET")?;
            Reply::ok(state.store.root_domains().subdomains(&id)?)
        }

        Route::Subdomains => subdomains::collection(state, call),
        Route::Subdomain(id) => subdomains::item(state, &id, call),
        Route::SubdomainsRecent(minutes) => subdomains::recent(state, &minutes, call),
        Route::SubdomainIps(id) => subdomains::associate_ips(state, &id, call),

        Route::Ips => assets::ips(state, call),
        Route::Ip(address) => assets::ip(state, &address, call),
        Route::Vulns => assets::vulns(state, call),
        Route::Vuln(id) => assets::vuln(state, &id, call),

        Route::Users => access::users(state, call),
        Route::Jobs => access::jobs(state, call),
        Route::JobsNext(queue) => access::next_job(state, &queue, call),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::auth::KeyCache;
    use crate::jobs::SqliteJobQueue;
    use crate::notify::{AlertSink, DeliveryError, Notifier, RetryPolicy};
    use crate::store::AssetStore;

    pub struct NullSink;

    impl AlertSink for NullSink {
        fn deliver(&self, _endpoint: &str, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    pub fn state() -> ServerState {
        let store = AssetStore::in_memory().unwrap();
        ServerState {
            keys: KeyCache::new(),
            jobs: Arc::new(SqliteJobQueue::new(store.db().clone())),
            notifier: Notifier::spawn(
                Arc::new(NullSink),
                Default::default(),
                RetryPolicy::default(),
            ),
            store,
        }
    }

    /// Run one request through the router and handlers
    pub fn call(
        state: &ServerState,
        method: &str,
        url: &str,
        body: &str,
    ) -> Result<Reply, ApiError> {
        let route = Route::parse(url).ok_or_else(|| ApiError::not_found(url))?;
        let query: HashMap<String, String> = super::super::router::query_params(url);
        let path = url.split('?').next().unwrap_or(url);
        dispatch(
            state,
            route,
            &Call {
                method,
                path,
                body,
                query: &query,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{call, state};

    #[test]
    fn test_health() {
        let state = state();
        let reply = call(&state, "GET", "/api/health", "").unwrap();
        assert_eq!(reply.body["status"], "ok");
    }

    #[test]
    fn test_wrong_method() {
        let state = state();
        let err = call(&state, "PATCH", "/api/platforms", "").unwrap_err();
        assert_eq!(err.status, 405);
        let err = call(&state, "POST", "/api/platforms/h1/programs", "").unwrap_err();
        assert_eq!(err.status, 405);
    }
}
