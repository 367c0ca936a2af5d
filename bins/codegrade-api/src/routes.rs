use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::metrics;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/interviews", post(handlers::create_interview))
        .route("/interviews/:id", get(handlers::get_interview))
        .route("/interviews/:id/start", post(handlers::start_interview))
        .route("/interviews/:id/cancel", post(handlers::cancel_interview))
        .route("/interviews/:id/expire", post(handlers::expire_interview))
        .route("/interviews/:id/mcq-answers", post(handlers::record_mcq_answer))
        .route("/interviews/:id/complete", post(handlers::complete_interview))
        .route(
            "/interviews/:id/submissions",
            post(handlers::create_submission).get(handlers::list_submissions),
        )
        .route("/interviews/:id/run", post(handlers::run_code))
        .route("/jobs/:job_id", get(handlers::get_run_outcome))
        .route(
            "/submissions/:id",
            get(handlers::get_submission)
                .put(handlers::edit_submission)
                .delete(handlers::delete_submission),
        )
        .layer(middleware::from_fn(metrics::track_requests))
}
