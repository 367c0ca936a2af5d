/// Grading Pipeline - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate assembler, judge and evaluator to grade code, then persist.
///
/// **Architecture:**
/// 1. Assemble source once per job (template.rs)
/// 2. Send it to the judge per test case under a client-side timeout (judge.rs)
/// 3. Turn each report into a verdict (evaluator.rs)
/// 4. Record results (store.rs) after every test case has finished
///
/// Run and submit jobs share steps 1–3; only what happens to the
/// evaluations differs.
///
/// **Superseded Submissions:**
/// An edit re-queues the submission. A job whose code no longer matches the
/// stored row is dropped, before PENDING is written and again before the
/// final verdicts, so an older job never overwrites a newer grading.

use codegrade_common::config::GradingConfig;
use codegrade_common::error::{GraderError, Result};
use codegrade_common::languages::LanguageTable;
use codegrade_common::questions::QuestionCatalog;
use codegrade_common::store::SubmissionStore;
use codegrade_common::template;
use codegrade_common::types::{
    CodeSubmission, CodingQuestion, GradingJob, JobKind, Language, RunOutcome, TestCase,
    TestCaseResult, Verdict,
};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::evaluator::{self, Evaluation};
use crate::judge::Judge;

/// Assembled program ready to be sent to the judge
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub language_id: u32,
    pub source: String,
}

/// What the worker loop should do with a finished job
#[derive(Debug)]
pub enum JobOutcome {
    Run(RunOutcome),
    Graded(Vec<TestCaseResult>),
    Superseded { submission_id: Uuid },
}

pub struct GradingPipeline {
    judge: Arc<dyn Judge>,
    languages: LanguageTable,
    settings: GradingConfig,
}

impl GradingPipeline {
    pub fn new(judge: Arc<dyn Judge>, languages: LanguageTable, settings: GradingConfig) -> Self {
        Self {
            judge,
            languages,
            settings,
        }
    }

    /// Template lookup + assembly; fails before any judge call
    pub fn prepare(
        &self,
        question: &CodingQuestion,
        language: Language,
        code: &str,
    ) -> Result<PreparedSource> {
        let source = template::assemble(question, language, code)?;
        Ok(PreparedSource {
            language_id: self.languages.judge_language_id(language),
            source,
        })
    }

    /// One judge round-trip + evaluation, bounded by the configured timeout
    pub async fn judge_case(
        &self,
        prepared: &PreparedSource,
        question: &CodingQuestion,
        test_case: &TestCase,
    ) -> Result<Evaluation> {
        let submit = self
            .judge
            .submit(prepared.language_id, &prepared.source, &test_case.input);

        let report = tokio::time::timeout(self.settings.judge_timeout, submit)
            .await
            .map_err(|_| {
                GraderError::ExternalService(format!(
                    "judge did not respond within {}ms",
                    self.settings.judge_timeout.as_millis()
                ))
            })??;

        let evaluation = evaluator::evaluate(&report, question.time_limit_secs, &test_case.expected_output);
        debug!(
            test_case_id = %test_case.id,
            judge_status = %report.status_description,
            verdict = %evaluation.verdict,
            time_used = evaluation.time_used,
            "Test case evaluated"
        );
        Ok(evaluation)
    }

    /// Run the candidate's code against one sample test case
    #[instrument(skip(self, question, code), fields(question_id = %question.id, language = %language))]
    pub async fn run_sample(
        &self,
        question: &CodingQuestion,
        language: Language,
        code: &str,
        test_case_id: Option<Uuid>,
    ) -> Result<(Uuid, Evaluation)> {
        let test_case = match test_case_id {
            Some(id) => question.test_case(id)?,
            None => question.sample_case()?,
        };
        let prepared = self.prepare(question, language, code)?;
        let evaluation = self.judge_case(&prepared, question, test_case).await?;
        Ok((test_case.id, evaluation))
    }

    /// Grade every test case of a stored submission and record the verdicts.
    ///
    /// Judge calls fan out with at most `max_parallel_tests` in flight; results
    /// are recorded only after all of them finished. A judge failure on one
    /// case becomes INTERNAL_ERROR for that case.
    #[instrument(skip(self, store, submission, question), fields(submission_id = %submission.id))]
    pub async fn grade_submission(
        &self,
        store: &dyn SubmissionStore,
        submission: &CodeSubmission,
        question: &CodingQuestion,
    ) -> Result<Vec<TestCaseResult>> {
        if submission.question_id != question.id {
            return Err(GraderError::Validation(format!(
                "submission {} is for question {}, not {}",
                submission.id, submission.question_id, question.id
            )));
        }

        let prepared = self.prepare(question, submission.language, &submission.code)?;

        for test_case in &question.test_cases {
            store
                .record_result(submission.id, test_case.id, Verdict::Pending, String::new(), false)
                .await?;
        }

        info!(
            test_cases = question.test_cases.len(),
            max_parallel = self.settings.max_parallel_tests,
            "Dispatching test cases to judge"
        );

        let evaluations: Vec<(Uuid, Result<Evaluation>)> = stream::iter(question.test_cases.iter())
            .map(|test_case| {
                let prepared = &prepared;
                async move {
                    (
                        test_case.id,
                        self.judge_case(prepared, question, test_case).await,
                    )
                }
            })
            .buffer_unordered(self.settings.max_parallel_tests.max(1))
            .collect()
            .await;

        let current = store.get(submission.id).await?;
        if current.code != submission.code {
            return Err(superseded(submission.id));
        }

        let mut recorded = Vec::with_capacity(evaluations.len());
        for (test_case_id, evaluation) in evaluations {
            let (verdict, user_output, passed) = match evaluation {
                Ok(eval) => {
                    let passed = eval.passed();
                    (eval.verdict, eval.normalized_stdout, passed)
                }
                Err(e) => {
                    warn!(test_case_id = %test_case_id, error = %e, "Judge call failed; recording internal error");
                    (Verdict::InternalError, String::new(), false)
                }
            };
            recorded.push(
                store
                    .record_result(submission.id, test_case_id, verdict, user_output, passed)
                    .await?,
            );
        }

        // Keep the question's test case order
        recorded.sort_by_key(|r| {
            question
                .test_cases
                .iter()
                .position(|tc| tc.id == r.test_case_id)
                .unwrap_or(usize::MAX)
        });

        let passed = recorded.iter().filter(|r| r.passed).count();
        info!(passed, total = recorded.len(), "Submission graded");

        Ok(recorded)
    }

    /// Execute a queued job end to end
    pub async fn execute_job(
        &self,
        job: &GradingJob,
        questions: &dyn QuestionCatalog,
        store: &dyn SubmissionStore,
    ) -> Result<JobOutcome> {
        match &job.kind {
            JobKind::Run { test_case_id } => {
                // A run always leaves an outcome behind for the poller
                let evaluated = match questions.get(job.question_id).await {
                    Ok(question) => {
                        self.run_sample(&question, job.language, &job.code, *test_case_id)
                            .await
                    }
                    Err(e) => Err(e),
                };
                let outcome = match evaluated {
                    Ok((test_case_id, eval)) => RunOutcome {
                        job_id: job.id,
                        test_case_id: Some(test_case_id),
                        verdict: eval.verdict,
                        stdout: eval.normalized_stdout,
                        time_used: eval.time_used,
                        error: None,
                    },
                    Err(e) => failed_run(job, &e),
                };
                Ok(JobOutcome::Run(outcome))
            }
            JobKind::Submit { submission_id } => {
                let question = questions.get(job.question_id).await?;
                // The stored row is authoritative; the job's copy only detects edits
                let submission = store.get(*submission_id).await?;
                if submission.code != job.code {
                    info!(job_id = %job.id, submission_id = %submission_id, "Submission edited since queued; skipping");
                    return Ok(JobOutcome::Superseded { submission_id: *submission_id });
                }
                match self.grade_submission(store, &submission, &question).await {
                    Ok(results) => Ok(JobOutcome::Graded(results)),
                    Err(GraderError::Conflict(reason)) => {
                        info!(job_id = %job.id, reason = %reason, "Discarding stale grading");
                        Ok(JobOutcome::Superseded { submission_id: *submission_id })
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn superseded(submission_id: Uuid) -> GraderError {
    GraderError::Conflict(format!("submission {} was edited during grading", submission_id))
}

/// Client-facing run outcome for a failed run; judge internals stay in the logs
fn failed_run(job: &GradingJob, error: &GraderError) -> RunOutcome {
    warn!(job_id = %job.id, error = %error, "Run failed");
    let message = if error.is_internal() {
        "execution service unavailable, please retry".to_string()
    } else {
        error.to_string()
    };
    RunOutcome {
        job_id: job.id,
        test_case_id: None,
        verdict: Verdict::InternalError,
        stdout: String::new(),
        time_used: 0.0,
        error: Some(message),
    }
}
