// Job queue seam between the HTTP surface and the workers.

use async_trait::async_trait;
use codegrade_common::error::Result;
use codegrade_common::redis;
use codegrade_common::types::{GradingJob, RunOutcome};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &GradingJob) -> Result<()>;

    /// `None` while the run is still queued or executing
    async fn run_outcome(&self, job_id: Uuid) -> Result<Option<RunOutcome>>;
}

#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ::redis::aio::ConnectionManager,
}

impl RedisJobQueue {
    pub fn new(conn: ::redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &GradingJob) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::push_job(&mut conn, job).await
    }

    async fn run_outcome(&self, job_id: Uuid) -> Result<Option<RunOutcome>> {
        let mut conn = self.conn.clone();
        redis::get_run_outcome(&mut conn, &job_id).await
    }
}

/// In-process queue for handler tests
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: RwLock<Vec<GradingJob>>,
    outcomes: RwLock<HashMap<Uuid, RunOutcome>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<GradingJob> {
        self.jobs.read().await.clone()
    }

    pub async fn complete_run(&self, outcome: RunOutcome) {
        self.outcomes.write().await.insert(outcome.job_id, outcome);
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &GradingJob) -> Result<()> {
        self.jobs.write().await.push(job.clone());
        Ok(())
    }

    async fn run_outcome(&self, job_id: Uuid) -> Result<Option<RunOutcome>> {
        Ok(self.outcomes.read().await.get(&job_id).cloned())
    }
}
