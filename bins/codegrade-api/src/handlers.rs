// HTTP route handlers for the Codegrade API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use codegrade_common::template;
use codegrade_common::types::{
    CodeSubmission, CodingQuestion, GradingJob, Interview, InterviewStatus, JobKind, Language,
    McqAnswer, NewSubmission, SubmissionWithResults, Verdict,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::metrics::{self, INTERVIEWS_COMPLETED_TOTAL, JOBS_ENQUEUED_TOTAL};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct McqAnswerRequest {
    pub question_id: Uuid,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub question_id: Uuid,
    pub language: Language,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub question_id: Uuid,
    pub language: Language,
    pub code: String,
    pub test_case_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionFilter {
    pub question_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionAccepted {
    pub submission: CodeSubmission,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
}

/// One test case result as the candidate may see it
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub test_case_id: Uuid,
    pub is_hidden: bool,
    pub verdict: Verdict,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_output: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: CodeSubmission,
    pub passed_count: u32,
    pub total: usize,
    pub results: Vec<ResultView>,
}

impl SubmissionView {
    /// Hidden cases keep only verdict and pass flag. Without the question
    /// every case is treated as hidden.
    fn redacted(graded: SubmissionWithResults, question: Option<&CodingQuestion>) -> Self {
        let passed_count = graded.passed_count();
        let results: Vec<ResultView> = graded
            .results
            .into_iter()
            .map(|r| {
                let is_hidden = question
                    .and_then(|q| q.test_case(r.test_case_id).ok())
                    .map_or(true, |tc| tc.is_hidden);
                ResultView {
                    test_case_id: r.test_case_id,
                    is_hidden,
                    verdict: r.verdict,
                    passed: r.passed,
                    user_output: (!is_hidden).then_some(r.user_output),
                }
            })
            .collect();
        Self {
            submission: graded.submission,
            passed_count,
            total: results.len(),
            results,
        }
    }
}

async fn require_in_progress(state: &AppState, interview_id: Uuid) -> ApiResult<Interview> {
    let interview = state.interviews.get(interview_id).await?;
    if interview.status != InterviewStatus::InProgress {
        return Err(ApiError::conflict(format!(
            "interview {} is {}; submissions are only accepted while IN_PROGRESS",
            interview_id, interview.status
        )));
    }
    Ok(interview)
}

async fn enqueue(state: &AppState, job: GradingJob) -> ApiResult<Uuid> {
    let kind = match job.kind {
        JobKind::Run { .. } => "run",
        JobKind::Submit { .. } => "submit",
    };
    state.queue.enqueue(&job).await.map_err(|e| {
        error!(job_id = %job.id, error = %e, "Failed to queue job");
        ApiError::from(e)
    })?;
    JOBS_ENQUEUED_TOTAL
        .with_label_values(&[kind, job.language.as_str()])
        .inc();
    info!(
        job_id = %job.id,
        kind,
        question_id = %job.question_id,
        language = %job.language,
        "Job queued"
    );
    Ok(job.id)
}

fn submit_job(submission: &CodeSubmission) -> GradingJob {
    GradingJob {
        id: Uuid::new_v4(),
        question_id: submission.question_id,
        language: submission.language,
        code: submission.code.clone(),
        kind: JobKind::Submit {
            submission_id: submission.id,
        },
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics".to_string())
        }
    }
}

/// POST /interviews
pub async fn create_interview(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let interview = state.interviews.create(Interview::scheduled(Uuid::new_v4())).await?;
    info!(interview_id = %interview.id, "Interview scheduled");
    Ok((StatusCode::CREATED, Json(interview)))
}

/// GET /interviews/{id}
pub async fn get_interview(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Interview>> {
    Ok(Json(state.interviews.get(interview_id).await?))
}

/// POST /interviews/{id}/start
pub async fn start_interview(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Interview>> {
    let interview = state
        .interviews
        .transition(interview_id, InterviewStatus::Scheduled, InterviewStatus::InProgress)
        .await?;
    info!(interview_id = %interview_id, "Interview started");
    Ok(Json(interview))
}

async fn close_interview(
    state: &AppState,
    interview_id: Uuid,
    to: InterviewStatus,
) -> ApiResult<Json<Interview>> {
    let current = state.interviews.get(interview_id).await?;
    let interview = state
        .interviews
        .transition(interview_id, current.status, to)
        .await?;
    info!(interview_id = %interview_id, from = %current.status, to = %to, "Interview closed");
    Ok(Json(interview))
}

/// POST /interviews/{id}/cancel
pub async fn cancel_interview(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Interview>> {
    close_interview(&state, interview_id, InterviewStatus::Cancelled).await
}

/// POST /interviews/{id}/expire
pub async fn expire_interview(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Interview>> {
    close_interview(&state, interview_id, InterviewStatus::Expired).await
}

/// POST /interviews/{id}/mcq-answers
pub async fn record_mcq_answer(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<McqAnswerRequest>,
) -> ApiResult<StatusCode> {
    require_in_progress(&state, interview_id).await?;
    state
        .interviews
        .record_mcq_answer(McqAnswer {
            interview_id,
            question_id: payload.question_id,
            is_correct: payload.is_correct,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /interviews/{id}/complete - Score and close the interview
pub async fn complete_interview(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
) -> ApiResult<Json<Interview>> {
    let interview = state.scoring.complete_interview(interview_id).await?;
    let passed = interview.is_passed.unwrap_or(false).to_string();
    INTERVIEWS_COMPLETED_TOTAL.with_label_values(&[&passed]).inc();
    Ok(Json(interview))
}

/// POST /interviews/{id}/submissions - Store code and queue it for grading
pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<SubmitRequest>,
) -> ApiResult<impl IntoResponse> {
    require_in_progress(&state, interview_id).await?;
    template::check_source_size(&payload.code)?;
    let question = state.questions.get(payload.question_id).await?;
    question.template(payload.language)?;

    let submission = state
        .submissions
        .create(NewSubmission {
            interview_id,
            question_id: question.id,
            language: payload.language,
            code: payload.code,
        })
        .await?;

    let job_id = enqueue(&state, submit_job(&submission)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionAccepted { submission, job_id }),
    ))
}

/// GET /interviews/{id}/submissions?question_id= - Most recent first
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
    Query(filter): Query<SubmissionFilter>,
) -> ApiResult<Json<Vec<CodeSubmission>>> {
    state.interviews.get(interview_id).await?;
    let submissions = match filter.question_id {
        Some(question_id) => {
            state
                .submissions
                .get_by_interview_and_question(interview_id, question_id)
                .await?
        }
        None => state.submissions.get_by_interview(interview_id).await?,
    };
    Ok(Json(submissions))
}

/// POST /interviews/{id}/run - Queue a sample run; poll GET /jobs/{job_id}
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Path(interview_id): Path<Uuid>,
    Json(payload): Json<RunRequest>,
) -> ApiResult<impl IntoResponse> {
    require_in_progress(&state, interview_id).await?;
    template::check_source_size(&payload.code)?;
    let question = state.questions.get(payload.question_id).await?;
    question.template(payload.language)?;

    let test_case = match payload.test_case_id {
        Some(id) => question.test_case(id)?,
        None => question.sample_case()?,
    };
    if test_case.is_hidden {
        return Err(ApiError::bad_request("hidden test cases cannot be run directly"));
    }

    let job_id = enqueue(
        &state,
        GradingJob {
            id: Uuid::new_v4(),
            question_id: question.id,
            language: payload.language,
            code: payload.code,
            kind: JobKind::Run {
                test_case_id: Some(test_case.id),
            },
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

/// GET /jobs/{job_id} - Run outcome, 202 while still pending
pub async fn get_run_outcome(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_uuid = Uuid::parse_str(&job_id)
        .map_err(|_| ApiError::bad_request("Invalid job ID format"))?;

    match state.queue.run_outcome(job_uuid).await? {
        Some(outcome) => {
            info!(job_id = %job_id, verdict = %outcome.verdict, "Run outcome retrieved");
            Ok((StatusCode::OK, Json(outcome)).into_response())
        }
        None => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "job_id": job_id,
                "status": "pending",
                "message": "Job is queued or still executing"
            })),
        )
            .into_response()),
    }
}

/// GET /submissions/{id} - Submission with redacted results
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<Json<SubmissionView>> {
    let graded = state.submissions.get_with_results(submission_id).await?;
    let question = match state.questions.get(graded.submission.question_id).await {
        Ok(question) => Some(question),
        Err(e) => {
            warn!(submission_id = %submission_id, error = %e, "Question unavailable; hiding all outputs");
            None
        }
    };
    Ok(Json(SubmissionView::redacted(graded, question.as_ref())))
}

/// PUT /submissions/{id} - Replace code and re-grade
pub async fn edit_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
    Json(payload): Json<EditRequest>,
) -> ApiResult<Json<SubmissionAccepted>> {
    let existing = state.submissions.get(submission_id).await?;
    require_in_progress(&state, existing.interview_id).await?;
    template::check_source_size(&payload.code)?;

    let submission = state
        .submissions
        .update_code(submission_id, payload.code)
        .await?;
    let job_id = enqueue(&state, submit_job(&submission)).await?;

    Ok(Json(SubmissionAccepted { submission, job_id }))
}

/// DELETE /submissions/{id} - Removes the submission and its results
pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = state.submissions.get(submission_id).await?;
    require_in_progress(&state, existing.interview_id).await?;
    state.submissions.delete(submission_id).await?;
    info!(submission_id = %submission_id, "Submission deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryJobQueue;
    use crate::routes;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        Router,
    };
    use codegrade_common::config::ScoringConfig;
    use codegrade_common::interview::MemoryInterviewStore;
    use codegrade_common::questions::{MemoryQuestionCatalog, QuestionCatalog};
    use codegrade_common::scoring::ScoreAggregator;
    use codegrade_common::store::{MemorySubmissionStore, SubmissionStore};
    use codegrade_common::types::{Difficulty, RunOutcome, StarterCode, TestCase};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        queue: Arc<MemoryJobQueue>,
        submissions: Arc<MemorySubmissionStore>,
        question: CodingQuestion,
    }

    impl TestApp {
        fn visible_case(&self) -> &TestCase {
            &self.question.test_cases[0]
        }

        fn hidden_case(&self) -> &TestCase {
            &self.question.test_cases[1]
        }

        async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        async fn started_interview(&self) -> String {
            let (status, body) = self.send("POST", "/interviews", None).await;
            assert_eq!(status, StatusCode::CREATED);
            let id = body["id"].as_str().unwrap().to_string();
            let (status, _) = self.send("POST", &format!("/interviews/{}/start", id), None).await;
            assert_eq!(status, StatusCode::OK);
            id
        }

        fn submit_body(&self, code: &str) -> Value {
            json!({
                "question_id": self.question.id,
                "language": "python",
                "code": code
            })
        }
    }

    async fn test_app() -> TestApp {
        let question = CodingQuestion {
            id: Uuid::new_v4(),
            title: "Sum".to_string(),
            difficulty: Difficulty::Easy,
            points: 10,
            time_limit_secs: 2.0,
            memory_limit_kb: 131_072,
            statement: String::new(),
            templates: [(
                Language::Python,
                StarterCode {
                    header: String::new(),
                    starter: "class Solution:\n    def solve(self):".to_string(),
                    footer: "print(Solution().solve())".to_string(),
                },
            )]
            .into_iter()
            .collect(),
            test_cases: vec![
                TestCase {
                    id: Uuid::new_v4(),
                    input: "2 3".to_string(),
                    expected_output: "5".to_string(),
                    is_hidden: false,
                },
                TestCase {
                    id: Uuid::new_v4(),
                    input: "40 2".to_string(),
                    expected_output: "hidden-answer-42".to_string(),
                    is_hidden: true,
                },
            ],
        };

        let questions = Arc::new(MemoryQuestionCatalog::new());
        questions.publish(&question).await.unwrap();
        let submissions = Arc::new(MemorySubmissionStore::new());
        let interviews = Arc::new(MemoryInterviewStore::new());
        let queue = Arc::new(MemoryJobQueue::new());

        let state = Arc::new(AppState {
            interviews: interviews.clone(),
            submissions: submissions.clone(),
            questions,
            queue: queue.clone(),
            scoring: ScoreAggregator::new(submissions.clone(), interviews, ScoringConfig::default()),
        });

        TestApp {
            router: routes::routes().with_state(state),
            queue,
            submissions,
            question,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app().await;
        let (status, _) = app.send("GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_interview_lifecycle_endpoints() {
        let app = test_app().await;
        let (status, body) = app.send("POST", "/interviews", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "SCHEDULED");
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = app.send("GET", &format!("/interviews/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SCHEDULED");

        let (status, _) = app.send("POST", &format!("/interviews/{}/start", id), None).await;
        assert_eq!(status, StatusCode::OK);

        // Already started
        let (status, _) = app.send("POST", &format!("/interviews/{}/start", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app.send("POST", &format!("/interviews/{}/cancel", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CANCELLED");

        let (status, _) = app.send("POST", &format!("/interviews/{}/expire", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_interview_is_not_found() {
        let app = test_app().await;
        let (status, body) = app
            .send("GET", &format!("/interviews/{}", Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_submission_requires_started_interview() {
        let app = test_app().await;
        let (_, body) = app.send("POST", "/interviews", None).await;
        let id = body["id"].as_str().unwrap();

        let (status, _) = app
            .send("POST", &format!("/interviews/{}/submissions", id), Some(app.submit_body("return 5")))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(app.queue.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_submission_enqueues_grading() {
        let app = test_app().await;
        let id = app.started_interview().await;

        let (status, body) = app
            .send("POST", &format!("/interviews/{}/submissions", id), Some(app.submit_body("return 5")))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let submission_id: Uuid = body["submission"]["id"].as_str().unwrap().parse().unwrap();

        let jobs = app.queue.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Submit { submission_id });
        assert_eq!(jobs[0].code, "return 5");

        let (status, list) = app
            .send(
                "GET",
                &format!("/interviews/{}/submissions?question_id={}", id, app.question.id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, other) = app
            .send(
                "GET",
                &format!("/interviews/{}/submissions?question_id={}", id, Uuid::new_v4()),
                None,
            )
            .await;
        assert!(other.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submission_validation_errors() {
        let app = test_app().await;
        let id = app.started_interview().await;
        let uri = format!("/interviews/{}/submissions", id);

        let unknown_question = json!({"question_id": Uuid::new_v4(), "language": "python", "code": ""});
        let (status, _) = app.send("POST", &uri, Some(unknown_question)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let no_template = json!({"question_id": app.question.id, "language": "java", "code": ""});
        let (status, _) = app.send("POST", &uri, Some(no_template)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let oversized = app.submit_body(&"x".repeat(template::MAX_SOURCE_CODE_BYTES + 1));
        let (status, _) = app.send("POST", &uri, Some(oversized)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unsupported = json!({"question_id": app.question.id, "language": "ruby", "code": ""});
        let (status, _) = app.send("POST", &uri, Some(unsupported)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        assert!(app.queue.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_defaults_to_visible_sample() {
        let app = test_app().await;
        let id = app.started_interview().await;

        let (status, body) = app
            .send("POST", &format!("/interviews/{}/run", id), Some(app.submit_body("return 5")))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

        let jobs = app.queue.jobs().await;
        assert_eq!(
            jobs[0].kind,
            JobKind::Run {
                test_case_id: Some(app.visible_case().id)
            }
        );

        let (status, body) = app.send("GET", &format!("/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "pending");

        app.queue
            .complete_run(RunOutcome {
                job_id,
                test_case_id: Some(app.visible_case().id),
                verdict: Verdict::Accepted,
                stdout: "5".to_string(),
                time_used: 0.8,
                error: None,
            })
            .await;
        let (status, body) = app.send("GET", &format!("/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "ACCEPTED");
    }

    #[tokio::test]
    async fn test_run_rejects_hidden_case() {
        let app = test_app().await;
        let id = app.started_interview().await;
        let mut body = app.submit_body("return 5");
        body["test_case_id"] = json!(app.hidden_case().id);

        let (status, _) = app.send("POST", &format!("/interviews/{}/run", id), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.queue.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_job_id() {
        let app = test_app().await;
        let (status, _) = app.send("GET", "/jobs/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hidden_results_are_redacted() {
        let app = test_app().await;
        let id = app.started_interview().await;
        let (_, body) = app
            .send("POST", &format!("/interviews/{}/submissions", id), Some(app.submit_body("return 5")))
            .await;
        let submission_id: Uuid = body["submission"]["id"].as_str().unwrap().parse().unwrap();

        app.submissions
            .record_result(submission_id, app.visible_case().id, Verdict::Accepted, "5".into(), true)
            .await
            .unwrap();
        app.submissions
            .record_result(
                submission_id,
                app.hidden_case().id,
                Verdict::WrongAnswer,
                "leaked-output".into(),
                false,
            )
            .await
            .unwrap();

        let (status, body) = app
            .send("GET", &format!("/submissions/{}", submission_id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed_count"], 1);
        assert_eq!(body["total"], 2);

        let raw = body.to_string();
        assert!(!raw.contains("leaked-output"));
        assert!(!raw.contains("hidden-answer-42"));

        let results = body["results"].as_array().unwrap();
        let visible = results
            .iter()
            .find(|r| r["test_case_id"] == json!(app.visible_case().id))
            .unwrap();
        assert_eq!(visible["user_output"], "5");
        let hidden = results.iter().find(|r| r["is_hidden"] == true).unwrap();
        assert_eq!(hidden["verdict"], "WRONG_ANSWER");
        assert!(hidden.get("user_output").is_none());
    }

    #[tokio::test]
    async fn test_edit_and_delete_submission() {
        let app = test_app().await;
        let id = app.started_interview().await;
        let (_, body) = app
            .send("POST", &format!("/interviews/{}/submissions", id), Some(app.submit_body("return 4")))
            .await;
        let submission_id = body["submission"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                "PUT",
                &format!("/submissions/{}", submission_id),
                Some(json!({"code": "return 5"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["submission"]["code"], "return 5");
        assert_eq!(body["submission"]["id"], submission_id.as_str());
        assert_eq!(app.queue.jobs().await.len(), 2);

        let (status, _) = app
            .send("DELETE", &format!("/submissions/{}", submission_id), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .send("GET", &format!("/submissions/{}", submission_id), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_interview_scores_and_freezes() {
        let app = test_app().await;
        let id = app.started_interview().await;

        for is_correct in [true, true, true, false] {
            let (status, _) = app
                .send(
                    "POST",
                    &format!("/interviews/{}/mcq-answers", id),
                    Some(json!({"question_id": Uuid::new_v4(), "is_correct": is_correct})),
                )
                .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, body) = app.send("POST", &format!("/interviews/{}/complete", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["total_score"], 3);
        assert_eq!(body["max_score"], 4);
        assert_eq!(body["is_passed"], true);

        let (status, _) = app.send("POST", &format!("/interviews/{}/complete", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send("POST", &format!("/interviews/{}/submissions", id), Some(app.submit_body("return 5")))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
