//! `hakstore jobs ...`

use anyhow::{Result, bail};

use hakstore::jobs::{Job, jobs_for_targets};

use super::Ctx;
use crate::commands::JobCommands;

/// Target value that expands to every known subdomain
const ALL_TARGETS: &str = "all";

pub fn job_command(ctx: &Ctx, command: JobCommands) -> Result<()> {
    let client = &ctx.client;
    match command {
        JobCommands::Create { queue, target } => {
            let jobs = if target.trim() == ALL_TARGETS {
                let subdomains = client.subdomains()?;
                jobs_for_targets(&queue, subdomains.into_iter().map(|s| s.id))
            } else {
                vec![Job::new(queue.as_str(), target.trim())]
            };
            if jobs.is_empty() {
                bail!("no subdomains to enqueue");
            }

            let message = client.enqueue_jobs(&jobs)?;
            ctx.emit(&jobs, |jobs| println!("{message} ({} jobs on {queue})", jobs.len()))
        }
        JobCommands::Next { queue } => match client.next_job(&queue)? {
            Some(job) => ctx.emit(&job, |job| println!("{}", job.target)),
            None => {
                eprintln!("queue {queue} is empty");
                Ok(())
            }
        },
    }
}
