/// Score Aggregator - Interview-level scoring at completion
///
/// **Scoring Rules:**
/// - total = correct MCQ answers + passed test case results across every
///   submission of the interview (resubmissions count again, no per-question
///   de-duplication)
/// - max = MCQ answers + submissions × `CODING_POINTS_PER_SUBMISSION`
///   (per submission, not per test case)
/// - passed = total >= pass_threshold × max
///
/// Runs only on an IN_PROGRESS interview. The final write is a status
/// compare-and-set, so exactly one completion wins.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::error::{GraderError, Result};
use crate::interview::InterviewStore;
use crate::store::SubmissionStore;
use crate::types::{Interview, InterviewScore, InterviewStatus, McqTally, SubmissionWithResults};

pub const CODING_POINTS_PER_SUBMISSION: u32 = 10;

/// Pure score computation
pub fn compute_score(
    mcq: McqTally,
    submissions: &[SubmissionWithResults],
    config: &ScoringConfig,
) -> InterviewScore {
    let coding: u32 = submissions.iter().map(|s| s.passed_count()).sum();
    let total_score = mcq.correct + coding;
    let max_score = mcq.answered + submissions.len() as u32 * CODING_POINTS_PER_SUBMISSION;
    let is_passed = f64::from(total_score) >= config.pass_threshold * f64::from(max_score);

    InterviewScore {
        total_score,
        max_score,
        is_passed,
    }
}

pub struct ScoreAggregator {
    submissions: Arc<dyn SubmissionStore>,
    interviews: Arc<dyn InterviewStore>,
    config: ScoringConfig,
}

impl ScoreAggregator {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        interviews: Arc<dyn InterviewStore>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            submissions,
            interviews,
            config,
        }
    }

    /// Compute and persist the final score, moving the interview to COMPLETED
    #[instrument(skip(self))]
    pub async fn complete_interview(&self, interview_id: Uuid) -> Result<Interview> {
        let interview = self.interviews.get(interview_id).await?;
        if interview.status != InterviewStatus::InProgress {
            warn!(
                interview_id = %interview_id,
                status = %interview.status,
                "Refusing to score interview outside IN_PROGRESS"
            );
            return Err(GraderError::Conflict(format!(
                "interview {} is {}; only an IN_PROGRESS interview can be completed",
                interview_id, interview.status
            )));
        }

        let mcq = self.interviews.mcq_tally(interview_id).await?;
        let mut graded = Vec::new();
        for submission in self.submissions.get_by_interview(interview_id).await? {
            match self.submissions.get_with_results(submission.id).await {
                Ok(with_results) => graded.push(with_results),
                // Deleted between listing and fetch
                Err(GraderError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        let score = compute_score(mcq, &graded, &self.config);
        let completed = self.interviews.complete_with_score(interview_id, score).await?;

        info!(
            interview_id = %interview_id,
            mcq_correct = mcq.correct,
            mcq_answered = mcq.answered,
            submissions = graded.len(),
            total_score = score.total_score,
            max_score = score.max_score,
            is_passed = score.is_passed,
            "Interview completed"
        );

        Ok(completed)
    }
}
