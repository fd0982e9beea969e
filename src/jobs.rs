//! Job dispatch queue
//!
//! Workers pull `(queue, target)` pairs, e.g. `{"queue": "nuclei", "target":
//! "www.tesla.com"}`. Enqueueing is fire-and-forget: no dedup, no priority and no
//! acknowledgement. The shipped backend keeps one FIFO per queue name in the
//! store's SQLite database.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::store::{StoreDb, StoreError, StoreResult, now_millis};

/// One unit of work for an external scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub queue: String,
    pub target: String,
}

impl Job {
    pub fn new(queue: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            target: target.into(),
        }
    }

    fn validate(&self) -> StoreResult<()> {
        if self.queue.trim().is_empty() {
            return Err(StoreError::invalid("job queue must not be empty"));
        }
        if self.target.trim().is_empty() {
            return Err(StoreError::invalid(format!(
                "job for queue {} has no target",
                self.queue
            )));
        }
        Ok(())
    }
}

/// A named-FIFO work queue
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: &Job) -> StoreResult<()>;

    /// Pop the oldest job of `queue`
    fn dequeue(&self, queue: &str) -> StoreResult<Option<Job>>;

    /// Jobs waiting in `queue`
    fn pending(&self, queue: &str) -> StoreResult<usize>;

    fn enqueue_all(&self, jobs: &[Job]) -> StoreResult<()> {
        jobs.iter().try_for_each(|job| self.enqueue(job))
    }
}

/// Build one job per target, keeping the targets' order
pub fn jobs_for_targets<I, S>(queue: &str, targets: I) -> Vec<Job>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    targets
        .into_iter()
        .map(|target| Job::new(queue, target))
        .collect()
}

/// Job queue stored in the `job_queue` table
#[derive(Clone)]
pub struct SqliteJobQueue {
    db: StoreDb,
}

impl SqliteJobQueue {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }
}

impl JobQueue for SqliteJobQueue {
    fn enqueue(&self, job: &Job) -> StoreResult<()> {
        self.enqueue_all(std::slice::from_ref(job))
    }

    /// All jobs land in one transaction, or none do
    fn enqueue_all(&self, jobs: &[Job]) -> StoreResult<()> {
        for job in jobs {
            job.validate()?;
        }
        self.db.transaction(|conn| {
            let now = now_millis();
            for job in jobs {
                conn.execute(
                    "INSERT INTO job_queue (queue, target, enqueued_at) VALUES (?1, ?2, ?3)",
                    params![job.queue.trim(), job.target.trim(), now],
                )?;
            }
            Ok(())
        })?;
        tracing::debug!("[hakstore:jobs] enqueued {} jobs", jobs.len());
        Ok(())
    }

    fn dequeue(&self, queue: &str) -> StoreResult<Option<Job>> {
        self.db.transaction(|conn| {
            let next = conn
                .query_row(
                    "SELECT seq, queue, target FROM job_queue WHERE queue = ?1 ORDER BY seq LIMIT 1",
                    params![queue],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            Job {
                                queue: row.get(1)?,
                                target: row.get(2)?,
                            },
                        ))
                    },
                )
                .optional()?;

            match next {
                Some((seq, job)) => {
                    conn.execute("DELETE FROM job_queue WHERE seq = ?1", params![seq])?;
                    Ok(Some(job))
                }
                None => Ok(None),
            }
        })
    }

    fn pending(&self, queue: &str) -> StoreResult<usize> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM job_queue WHERE queue = ?1",
            params![queue],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> SqliteJobQueue {
        SqliteJobQueue::new(StoreDb::open_in_memory().unwrap())
    }

    #[test]
    fn test_fifo_per_queue() {
        let q = queue();
        q.enqueue(&Job::new("nuclei", "a.tesla.com")).unwrap();
        q.enqueue(&Job::new("httpx", "x.tesla.com")).unwrap();
        q.enqueue(&Job::new("nuclei", "b.tesla.com")).unwrap();

        assert_eq!(q.pending("nuclei").unwrap(), 2);
        assert_eq!(q.dequeue("nuclei").unwrap().unwrap().target, "a.tesla.com");
        assert_eq!(q.dequeue("nuclei").unwrap().unwrap().target, "b.tesla.com");
        assert!(q.dequeue("nuclei").unwrap().is_none());
        assert_eq!(q.pending("httpx").unwrap(), 1);
    }

    #[test]
    fn test_no_dedup() {
        let q = queue();
        let job = Job::new("nuclei", "a.tesla.com");
        q.enqueue_all(&[job.clone(), job]).unwrap();
        assert_eq!(q.pending("nuclei").unwrap(), 2);
    }

    #[test]
    fn test_invalid_job_rejects_whole_batch() {
        let q = queue();
        let err = q
            .enqueue_all(&[Job::new("nuclei", "a.tesla.com"), Job::new("nuclei", " ")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(q.pending("nuclei").unwrap(), 0);
    }

    #[test]
    fn test_jobs_for_targets_keeps_order() {
        let jobs = jobs_for_targets("dnsx", ["c.example.com", "a.example.com", "b.example.com"]);
        let targets: Vec<&str> = jobs.iter().map(|j| j.target.as_str()).collect();
        assert_eq!(targets, ["c.example.com", "a.example.com", "b.example.com"]);
        assert!(jobs.iter().all(|j| j.queue == "dnsx"));
    }
}
