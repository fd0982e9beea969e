//! Subdomains: CRUD, temporal query and IP association

use serde::Deserialize;
use tracing::info;

use super::Call;
use super::hierarchy::delete;
use crate::server::ServerState;
use crate::server::types::{ApiError, Reply, decode, decode_batch};
use crate::store::{NewSubdomain, NodeRef, SubdomainUpdate};

pub fn collection(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.subdomains();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewSubdomain>(call.body)?;
            Reply::mirror(batch, repo.create_batch(items)?)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn item(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.subdomains();
    match call.method {
        "GET" => Reply::ok(repo.get(id)?),
        "PUT" => {
            let update: SubdomainUpdate = decode(call.body)?;
            Reply::ok(repo.update(id, update)?)
        }
        "DELETE" => delete(state, NodeRef::Subdomain(id.to_string())),
        _ => Err(call.not_allowed()),
    }
}

pub fn recent(state: &ServerState, minutes: &str, call: &Call) -> Result<Reply, ApiError> {
    call.only("GET")?;
    let minutes: u64 = minutes.trim().parse().map_err(|_| {
        ApiError::bad_request(
            "invalid_input",
            format!("minutes must be a non-negative integer, got {minutes:?}"),
        )
    })?;
    Reply::ok(state.store.subdomains().recent(minutes)?)
}

/// Accepts `"1.2.3.4"` or `{"id": "1.2.3.4", ...}`; any program given is ignored
#[derive(Deserialize)]
#[serde(untagged)]
enum IpRef {
    Address(String),
    Object { id: String },
}

pub fn associate_ips(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    call.only("POST")?;
    let (_, refs) = decode_batch::<IpRef>(call.body)?;
    let addresses: Vec<String> = refs
        .into_iter()
        .map(|r| match r {
            IpRef::Address(a) | IpRef::Object { id: a } => a,
        })
        .collect();

    let ips = state.store.subdomains().associate_ips(id, &addresses)?;
    info!("[hakstore:http] Associated {} IPs with {}", ips.len(), id);
    Reply::ok(ips)
}

#[cfg(test)]
mod tests {
    use crate::server::handlers::test_support::{call, state};

    fn seed(state: &crate::server::ServerState) {
        call(state, "POST", "/api/programs", r#"{"id":"tesla"}"#).unwrap();
        call(state, "POST", "/api/rootdomains", r#"{"id":"tesla.com","program":"tesla"}"#).unwrap();
    }

    #[test]
    fn test_create_derives_program() {
        let state = state();
        seed(&state);

        let reply = call(
            &state,
            "POST",
            "/api/subdomains",
            r#"{"id":"www.tesla.com","rootdomain":"tesla.com"}"#,
        )
        .unwrap();
        assert_eq!(reply.body["program"], "tesla");
    }

    #[test]
    fn test_associate_ips_scopes_to_program() {
        let state = state();
        seed(&state);
        call(
            &state,
            "POST",
            "/api/subdomains",
            r#"{"id":"www.tesla.com","rootdomain":"tesla.com"}"#,
        )
        .unwrap();

        let reply = call(
            &state,
            "POST",
            "/api/subdomains/www.tesla.com/ips",
            r#"[{"id":"1.2.3.4"},"5.6.7.8"]"#,
        )
        .unwrap();
        let ips = reply.body.as_array().unwrap();
        assert_eq!(ips.len(), 2);
        assert!(ips.iter().all(|ip| ip["program"] == "tesla"));

        let sub = call(&state, "GET", "/api/subdomains/www.tesla.com", "").unwrap();
        assert_eq!(sub.body["ips"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_associate_with_unknown_subdomain() {
        let state = state();
        let err = call(&state, "POST", "/api/subdomains/nope.example/ips", r#"["1.2.3.4"]"#)
            .unwrap_err();
        assert_eq!(err.status, 404);
        assert!(call(&state, "GET", "/api/ips", "").unwrap().body.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_recent() {
        let state = state();
        seed(&state);
        call(
            &state,
            "POST",
            "/api/subdomains",
            r#"{"id":"api.tesla.com","rootdomain":"tesla.com"}"#,
        )
        .unwrap();

        let recent = call(&state, "GET", "/api/subdomains/recent/60", "").unwrap();
        assert_eq!(recent.body.as_array().unwrap().len(), 1);

        let none = call(&state, "GET", "/api/subdomains/recent/0", "").unwrap();
        assert!(none.body.as_array().unwrap().is_empty());

        let err = call(&state, "GET", "/api/subdomains/recent/soon", "").unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_partial_update() {
        let state = state();
        seed(&state);
        call(
            &state,
            "POST",
            "/api/subdomains",
            r#"{"id":"www.tesla.com","rootdomain":"tesla.com","cname":"edge.example.net"}"#,
        )
        .unwrap();

        let updated = call(
            &state,
            "PUT",
            "/api/subdomains/www.tesla.com",
            r#"{"nameservers":["ns1.tesla.com"]}"#,
        )
        .unwrap();
        assert_eq!(updated.body["cname"], "edge.example.net");
        assert_eq!(updated.body["nameservers"][0], "ns1.tesla.com");
    }
}
