use crate::error::Result;
use crate::types::{GradingJob, RunOutcome};
use redis::AsyncCommands;
use uuid::Uuid;

/// Redis key semantics - defines only naming and queue semantics
/// Ensures API, worker and CLI never drift and keys are deterministic

pub const QUEUE_KEY: &str = "codegrade:queue:grading";
pub const RUN_PREFIX: &str = "codegrade:run";
pub const SUBMISSION_PREFIX: &str = "codegrade:submission";
pub const RESULTS_PREFIX: &str = "codegrade:results";
pub const INTERVIEW_PREFIX: &str = "codegrade:interview";
pub const QUESTION_PREFIX: &str = "codegrade:question";

/// Run outcome for a job
pub fn run_key(job_id: &Uuid) -> String {
    format!("{}:{}", RUN_PREFIX, job_id)
}

/// Submission document (JSON string)
pub fn submission_key(submission_id: &Uuid) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, submission_id)
}

/// Hash of test case id → TestCaseResult JSON; the hash field is the uniqueness key
pub fn results_key(submission_id: &Uuid) -> String {
    format!("{}:{}", RESULTS_PREFIX, submission_id)
}

/// Sorted set of submission ids scored by submitted_at
pub fn interview_submissions_key(interview_id: &Uuid) -> String {
    format!("{}:{}:submissions", INTERVIEW_PREFIX, interview_id)
}

/// Sorted set of submission ids for one (interview, question) pair
pub fn question_submissions_key(interview_id: &Uuid, question_id: &Uuid) -> String {
    format!(
        "{}:{}:question:{}:submissions",
        INTERVIEW_PREFIX, interview_id, question_id
    )
}

/// Interview hash (status and score fields)
pub fn interview_key(interview_id: &Uuid) -> String {
    format!("{}:{}", INTERVIEW_PREFIX, interview_id)
}

/// Hash of MCQ question id → "1" (correct) / "0"
pub fn mcq_answers_key(interview_id: &Uuid) -> String {
    format!("{}:{}:mcq", INTERVIEW_PREFIX, interview_id)
}

pub fn question_key(question_id: &Uuid) -> String {
    format!("{}:{}", QUESTION_PREFIX, question_id)
}

/// Push a grading job onto the queue
/// Uses RPUSH for FIFO semantics
pub async fn push_job(conn: &mut redis::aio::ConnectionManager, job: &GradingJob) -> Result<()> {
    let payload = serde_json::to_string(job)?;
    let _: () = conn.rpush(QUEUE_KEY, payload).await?;
    Ok(())
}

/// Pop a grading job
/// Uses BLPOP with timeout for graceful shutdown
pub async fn pop_job(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> Result<Option<GradingJob>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_KEY, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

/// Store a run outcome with a TTL
pub async fn store_run_outcome(
    conn: &mut redis::aio::ConnectionManager,
    outcome: &RunOutcome,
    ttl_seconds: u64,
) -> Result<()> {
    let payload = serde_json::to_string(outcome)?;
    let _: () = conn.set_ex(run_key(&outcome.job_id), payload, ttl_seconds).await?;
    Ok(())
}

pub async fn get_run_outcome(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &Uuid,
) -> Result<Option<RunOutcome>> {
    let payload: Option<String> = conn.get(run_key(job_id)).await?;

    match payload {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}
