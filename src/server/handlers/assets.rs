//! IPs and vulns

use tracing::info;

use super::Call;
use super::hierarchy::delete;
use crate::server::ServerState;
use crate::server::types::{ApiError, Reply, decode_batch};
use crate::store::{NewIp, NewVuln, NodeRef};

pub fn ips(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.ips();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewIp>(call.body)?;
            Reply::mirror(batch, repo.create_batch(items)?)
        }
        _ => Err(call.not_allowed()),
    }
}

/// `?program=` narrows an address to one program's row
pub fn ip(state: &ServerState, address: &str, call: &Call) -> Result<Reply, ApiError> {
    let program = call.param("program");
    match call.method {
        // updates are accepted and ignored
        "GET" | "PUT" => Reply::ok(state.store.ips().get(address, program)?),
        "DELETE" => delete(
            state,
            NodeRef::Ip {
                address: address.to_string(),
                program: program.map(str::to_string),
            },
        ),
        _ => Err(call.not_allowed()),
    }
}

pub fn vulns(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    match call.method {
        "GET" => Reply::ok(state.store.vulns().list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewVuln>(call.body)?;
            let stored = state.store.vulns().create_batch(items)?;

            let mut alerted = 0;
            for vuln in stored.fresh() {
                state.notifier.notify(vuln);
                alerted += 1;
            }
            info!(
                "[hakstore:http] Stored {} vulns ({} new)",
                stored.vulns.len(),
                alerted
            );
            Reply::mirror(batch, stored.vulns)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn vuln(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    let id: i64 = id.trim().parse().map_err(|_| {
        ApiError::bad_request("invalid_input", format!("vuln id must be an integer, got {id:?}"))
    })?;
    match call.method {
        "GET" | "PUT" => Reply::ok(state.store.vulns().get(id)?),
        "DELETE" => delete(state, NodeRef::Vuln(id)),
        _ => Err(call.not_allowed()),
    }
}

#[cfg(test)]
mod tests {
    use crate::server::handlers::test_support::{call, state};

    #[test]
    fn test_ip_rows_per_program() {
        let state = state();
        call(
            &state,
            "POST",
            "/api/ips",
            r#"[{"id":"1.2.3.4","program":"tesla"},{"id":"1.2.3.4","program":"gitlab"}]"#,
        )
        .unwrap();

        let all = call(&state, "GET", "/api/ips/1.2.3.4", "").unwrap();
        assert_eq!(all.body.as_array().unwrap().len(), 2);

        let one = call(&state, "GET", "/api/ips/1.2.3.4?program=gitlab", "").unwrap();
        assert_eq!(one.body.as_array().unwrap().len(), 1);
        assert_eq!(one.body[0]["program"], "gitlab");

        // PUT is a no-op
        let put = call(&state, "PUT", "/api/ips/1.2.3.4?program=tesla", r#"{"program":"x"}"#)
            .unwrap();
        assert_eq!(put.body[0]["program"], "tesla");

        let report = call(&state, "DELETE", "/api/ips/1.2.3.4?program=tesla", "").unwrap();
        assert_eq!(report.body["removed"].as_array().unwrap().len(), 1);
        assert_eq!(
            call(&state, "GET", "/api/ips", "").unwrap().body.as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_unknown_ip_is_not_found() {
        let state = state();
        let err = call(&state, "GET", "/api/ips/10.0.0.1", "").unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[test]
    fn test_vuln_create_get_delete() {
        let state = state();
        let created = call(
            &state,
            "POST",
            "/api/vulns",
            r#"{"description":"open redirect","severity":3,"program":"tesla","ips":["1.2.3.4"]}"#,
        )
        .unwrap();
        let id = created.body["id"].as_i64().unwrap();
        assert_eq!(created.body["program"], "tesla");

        let fetched = call(&state, "GET", &format!("/api/vulns/{id}"), "").unwrap();
        assert_eq!(fetched.body["ips"][0], "1.2.3.4");

        let report = call(&state, "DELETE", &format!("/api/vulns/{id}"), "").unwrap();
        assert_eq!(report.body["edges_cleared"], 1);

        let err = call(&state, "GET", &format!("/api/vulns/{id}"), "").unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[test]
    fn test_bad_severity_and_bad_id() {
        let state = state();
        let err = call(&state, "POST", "/api/vulns", r#"{"description":"x","severity":9}"#)
            .unwrap_err();
        assert_eq!(err.status, 400);

        let err = call(&state, "GET", "/api/vulns/abc", "").unwrap_err();
        assert_eq!(err.code, "invalid_input");
    }
}
