//! Platforms, programs and root domains

use tracing::info;

use super::Call;
use crate::server::ServerState;
use crate::server::router::ProgramChild;
use crate::server::types::{ApiError, Reply, decode, decode_batch};
use crate::store::{
    NewPlatform, NewProgram, NewRootDomain, NodeRef, PlatformUpdate, ProgramUpdate,
    RootDomainUpdate,
};

/// Cascade-delete `node` and answer with the report
pub(super) fn delete(state: &ServerState, node: NodeRef) -> Result<Reply, ApiError> {
    let report = state.store.delete(&node)?;
    info!(
        "[hakstore:http] Deleted {} ({} nodes, {} edges)",
        node,
        report.removed.len(),
        report.edges_cleared
    );
    Reply::ok(report)
}

pub fn platforms(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.platforms();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewPlatform>(call.body)?;
            Reply::mirror(batch, repo.create_batch(items)?)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn platform(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.platforms();
    match call.method {
        "GET" => Reply::ok(repo.get(id)?),
        "PUT" => {
            let update: PlatformUpdate = decode(call.body)?;
            Reply::ok(repo.update(id, update)?)
        }
        "DELETE" => delete(state, NodeRef::Platform(id.to_string())),
        _ => Err(call.not_allowed()),
    }
}

pub fn programs(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.programs();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewProgram>(call.body)?;
            Reply::mirror(batch, repo.create_batch(items)?)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn program(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.programs();
    match call.method {
        "GET" => Reply::ok(repo.get(id)?),
        "PUT" => {
            let update: ProgramUpdate = decode(call.body)?;
            Reply::ok(repo.update(id, update)?)
        }
        "DELETE" => delete(state, NodeRef::Program(id.to_string())),
        _ => Err(call.not_allowed()),
    }
}

pub fn program_children(
    state: &ServerState,
    id: &str,
    child: ProgramChild,
    call: &Call,
) -> Result<Reply, ApiError> {
    call.only("GET")?;
    let repo = state.store.programs();
    match child {
        ProgramChild::RootDomains => Reply::ok(repo.root_domains(id)?),
        ProgramChild::Ips => Reply::ok(repo.ips(id)?),
        ProgramChild::Subdomains => Reply::ok(repo.subdomains(id)?),
        ProgramChild::Vulns => Reply::ok(repo.vulns(id)?),
    }
}

pub fn root_domains(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.root_domains();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewRootDomain>(call.body)?;
            Reply::mirror(batch, repo.create_batch(items)?)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn root_domain(state: &ServerState, id: &str, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.root_domains();
    match call.method {
        "GET" => Reply::ok(repo.get(id)?),
        "PUT" => {
            let update: RootDomainUpdate = decode(call.body)?;
            Reply::ok(repo.update(id, update)?)
        }
        "DELETE" => delete(state, NodeRef::RootDomain(id.to_string())),
        _ => Err(call.not_allowed()),
    }
}
