mod error;
mod handlers;
mod metrics;
mod queue;
mod routes;

use anyhow::Context;
use axum::Router;
use codegrade_common::config::GraderConfig;
use codegrade_common::interview::{InterviewStore, RedisInterviewStore};
use codegrade_common::questions::{QuestionCatalog, RedisQuestionCatalog};
use codegrade_common::scoring::ScoreAggregator;
use codegrade_common::store::{RedisSubmissionStore, SubmissionStore};
use queue::{JobQueue, RedisJobQueue};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub interviews: Arc<dyn InterviewStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub questions: Arc<dyn QuestionCatalog>,
    pub queue: Arc<dyn JobQueue>,
    pub scoring: ScoreAggregator,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Codegrade API booting...");

    let config = GraderConfig::from_env();

    let client = redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    let redis_conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", config.redis_url);

    let submissions: Arc<dyn SubmissionStore> = Arc::new(RedisSubmissionStore::new(redis_conn.clone()));
    let interviews: Arc<dyn InterviewStore> = Arc::new(RedisInterviewStore::new(redis_conn.clone()));

    let state = Arc::new(AppState {
        scoring: ScoreAggregator::new(submissions.clone(), interviews.clone(), config.scoring),
        interviews,
        submissions,
        questions: Arc::new(RedisQuestionCatalog::new(redis_conn.clone())),
        queue: Arc::new(RedisJobQueue::new(redis_conn)),
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&config.api_bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_bind_addr))?;

    info!("HTTP server listening on {}", config.api_bind_addr);
    info!(pass_threshold = config.scoring.pass_threshold, "Ready to accept submissions");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
