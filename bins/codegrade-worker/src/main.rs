mod evaluator;
mod executor;
mod judge;

use async_trait::async_trait;
use codegrade_common::config::GraderConfig;
use codegrade_common::error::Result;
use codegrade_common::languages::LanguageTable;
use codegrade_common::questions::{QuestionCatalog, RedisQuestionCatalog};
use codegrade_common::redis;
use codegrade_common::store::{RedisSubmissionStore, SubmissionStore};
use codegrade_common::types::{GradingJob, RunOutcome};
use executor::{GradingPipeline, JobOutcome};
use judge::JudgeClient;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// BLPOP timeout; also bounds how long shutdown waits on an idle queue
const POLL_TIMEOUT_SECS: f64 = 5.0;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Where jobs come from and where run outcomes go
#[async_trait]
trait JobChannel: Send {
    async fn next_job(&mut self) -> Result<Option<GradingJob>>;
    async fn publish_run(&mut self, run: &RunOutcome, ttl_secs: u64) -> Result<()>;
}

#[async_trait]
impl JobChannel for ::redis::aio::ConnectionManager {
    async fn next_job(&mut self) -> Result<Option<GradingJob>> {
        redis::pop_job(self, POLL_TIMEOUT_SECS).await
    }

    async fn publish_run(&mut self, run: &RunOutcome, ttl_secs: u64) -> Result<()> {
        redis::store_run_outcome(self, run, ttl_secs).await
    }
}

struct Worker {
    pipeline: GradingPipeline,
    questions: Arc<dyn QuestionCatalog>,
    submissions: Arc<dyn SubmissionStore>,
    run_result_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Codegrade worker booting...");

    let config = GraderConfig::from_env();

    let languages = LanguageTable::load(Path::new(&config.languages_config)).map_err(|e| {
        error!("Failed to load language configurations: {}", e);
        error!("Make sure {} exists", config.languages_config);
        e
    })?;
    info!("Loaded language configurations for: {:?}", languages.list_languages());

    let judge = JudgeClient::new(config.judge.clone())?;
    info!(
        judge = %config.judge.base_url,
        timeout_ms = config.grading.judge_timeout.as_millis() as u64,
        max_parallel_tests = config.grading.max_parallel_tests,
        "Judge client configured"
    );

    let client = ::redis::Client::open(config.redis_url.as_str())?;
    let mut redis_conn = ::redis::aio::ConnectionManager::new(client).await?;
    info!("Connected to Redis: {}", config.redis_url);

    let worker = Worker {
        pipeline: GradingPipeline::new(Arc::new(judge), languages, config.grading.clone()),
        questions: Arc::new(RedisQuestionCatalog::new(redis_conn.clone())),
        submissions: Arc::new(RedisSubmissionStore::new(redis_conn.clone())),
        run_result_ttl_secs: config.run_result_ttl_secs,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received shutdown signal, stopping after current job...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    worker_loop(&mut redis_conn, &worker, shutdown_rx).await;

    info!("Worker shutdown complete");
    Ok(())
}

/// Pulls jobs until shutdown is signalled. The signal is only checked
/// between jobs; a job that was popped always runs to completion.
#[instrument(skip_all)]
async fn worker_loop<C: JobChannel>(channel: &mut C, worker: &Worker, shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        match channel.next_job().await {
            Ok(Some(job)) => handle_job(channel, worker, job).await,
            Ok(None) => {
                // Timeout - check for shutdown
                continue;
            }
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            }
        }
    }
}

async fn handle_job<C: JobChannel>(channel: &mut C, worker: &Worker, job: GradingJob) {
    let job_id = job.id;
    info!(
        job_id = %job_id,
        question_id = %job.question_id,
        language = %job.language,
        kind = ?job.kind,
        source_size = job.code.len(),
        "Received job"
    );

    let start = std::time::Instant::now();
    let outcome = match worker
        .pipeline
        .execute_job(&job, worker.questions.as_ref(), worker.submissions.as_ref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Job failed");
            return;
        }
    };
    let execution_ms = start.elapsed().as_millis() as u64;

    match outcome {
        JobOutcome::Run(run) => {
            info!(
                job_id = %job_id,
                verdict = %run.verdict,
                time_used = run.time_used,
                execution_ms,
                "Run completed"
            );
            match channel.publish_run(&run, worker.run_result_ttl_secs).await {
                Ok(()) => debug!(job_id = %job_id, "Run outcome persisted to Redis"),
                // Non-fatal - worker continues
                Err(e) => error!(job_id = %job_id, error = %e, "Failed to persist run outcome"),
            }
        }
        JobOutcome::Graded(results) => {
            for (idx, result) in results.iter().enumerate() {
                debug!(
                    job_id = %job_id,
                    test_num = idx + 1,
                    test_case_id = %result.test_case_id,
                    verdict = %result.verdict,
                    "Test result"
                );
            }
            info!(
                job_id = %job_id,
                passed = results.iter().filter(|r| r.passed).count(),
                total = results.len(),
                execution_ms,
                "Submission graded"
            );
        }
        JobOutcome::Superseded { submission_id } => {
            info!(job_id = %job_id, submission_id = %submission_id, execution_ms, "Submission superseded by a later edit");
        }
    }
}
