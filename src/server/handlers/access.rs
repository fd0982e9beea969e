//! Users and the job queue

use serde_json::json;
use tracing::info;

use super::Call;
use crate::jobs::Job;
use crate::server::ServerState;
use crate::server::types::{ApiError, Reply, decode_batch};
use crate::store::NewUser;

pub fn users(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    let repo = state.store.users();
    match call.method {
        "GET" => Reply::ok(repo.list()?),
        "POST" => {
            let (batch, items) = decode_batch::<NewUser>(call.body)?;
            let users = repo.create_batch(items)?;
            state.keys.insert_all(&users);
            info!("[hakstore:http] Registered {} users", users.len());
            Reply::mirror(batch, users)
        }
        _ => Err(call.not_allowed()),
    }
}

pub fn jobs(state: &ServerState, call: &Call) -> Result<Reply, ApiError> {
    call.only("POST")?;
    let (_, jobs) = decode_batch::<Job>(call.body)?;
    state.jobs.enqueue_all(&jobs)?;
    info!("[hakstore:http] Enqueued {} jobs", jobs.len());
    Reply::ok(json!({
        "success": true,
        "message": "Jobs created successfully.",
    }))
}

pub fn next_job(state: &ServerState, queue: &str, call: &Call) -> Result<Reply, ApiError> {
    call.only("POST")?;
    match state.jobs.dequeue(queue)? {
        Some(job) => Reply::ok(job),
        None => Err(ApiError::not_found(format!("queue {queue} is empty"))),
    }
}
