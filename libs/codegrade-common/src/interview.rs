/// Interview Store - Lifecycle state and MCQ answers for an interview
///
/// **Invariants:**
/// - Status only moves along `InterviewStatus::can_transition_to`
/// - Every status change is a compare-and-set on the expected current status,
///   so of two concurrent completions exactly one wins
/// - The score is written in the same step as the COMPLETED transition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;

use crate::error::{GraderError, Result};
use crate::redis::{interview_key, mcq_answers_key};
use crate::types::{Interview, InterviewScore, InterviewStatus, McqAnswer, McqTally};

#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn create(&self, interview: Interview) -> Result<Interview>;

    async fn get(&self, interview_id: Uuid) -> Result<Interview>;

    /// Move `from` → `to` only if the stored status is still `from`
    async fn transition(
        &self,
        interview_id: Uuid,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Interview>;

    /// IN_PROGRESS → COMPLETED together with the score fields, as one write
    async fn complete_with_score(&self, interview_id: Uuid, score: InterviewScore) -> Result<Interview>;

    /// One answer per (interview, MCQ question); re-answering replaces it
    async fn record_mcq_answer(&self, answer: McqAnswer) -> Result<()>;

    async fn mcq_tally(&self, interview_id: Uuid) -> Result<McqTally>;
}

fn not_found(interview_id: Uuid) -> GraderError {
    GraderError::NotFound(format!("interview {}", interview_id))
}

fn check_transition(interview_id: Uuid, from: InterviewStatus, to: InterviewStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(GraderError::Conflict(format!(
            "interview {} cannot move from {} to {}",
            interview_id, from, to
        )))
    }
}

fn stale_status(interview_id: Uuid, expected: InterviewStatus, actual: InterviewStatus) -> GraderError {
    GraderError::Conflict(format!(
        "interview {} is {}, expected {}",
        interview_id, actual, expected
    ))
}

#[derive(Debug, Default)]
struct MemoryInterviews {
    interviews: HashMap<Uuid, Interview>,
    mcq: HashMap<Uuid, HashMap<Uuid, bool>>,
}

#[derive(Debug, Default)]
pub struct MemoryInterviewStore {
    state: RwLock<MemoryInterviews>,
}

impl MemoryInterviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(
        state: &mut MemoryInterviews,
        interview_id: Uuid,
        from: InterviewStatus,
        to: InterviewStatus,
        score: Option<InterviewScore>,
    ) -> Result<Interview> {
        let current = state
            .interviews
            .get(&interview_id)
            .ok_or_else(|| not_found(interview_id))?;
        if current.status != from {
            return Err(stale_status(interview_id, from, current.status));
        }

        let mut next = Interview {
            status: to,
            ..current.clone()
        };
        if let Some(score) = score {
            next.total_score = Some(score.total_score);
            next.max_score = Some(score.max_score);
            next.is_passed = Some(score.is_passed);
        }
        state.interviews.insert(interview_id, next.clone());
        Ok(next)
    }
}

#[async_trait]
impl InterviewStore for MemoryInterviewStore {
    async fn create(&self, interview: Interview) -> Result<Interview> {
        let mut state = self.state.write().await;
        if state.interviews.contains_key(&interview.id) {
            return Err(GraderError::Conflict(format!(
                "interview {} already exists",
                interview.id
            )));
        }
        state.interviews.insert(interview.id, interview.clone());
        Ok(interview)
    }

    async fn get(&self, interview_id: Uuid) -> Result<Interview> {
        let state = self.state.read().await;
        state
            .interviews
            .get(&interview_id)
            .cloned()
            .ok_or_else(|| not_found(interview_id))
    }

    async fn transition(
        &self,
        interview_id: Uuid,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Interview> {
        check_transition(interview_id, from, to)?;
        let mut state = self.state.write().await;
        Self::apply(&mut state, interview_id, from, to, None)
    }

    async fn complete_with_score(&self, interview_id: Uuid, score: InterviewScore) -> Result<Interview> {
        let mut state = self.state.write().await;
        Self::apply(
            &mut state,
            interview_id,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            Some(score),
        )
    }

    async fn record_mcq_answer(&self, answer: McqAnswer) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.interviews.contains_key(&answer.interview_id) {
            return Err(not_found(answer.interview_id));
        }
        state
            .mcq
            .entry(answer.interview_id)
            .or_default()
            .insert(answer.question_id, answer.is_correct);
        Ok(())
    }

    async fn mcq_tally(&self, interview_id: Uuid) -> Result<McqTally> {
        let state = self.state.read().await;
        let answers = match state.mcq.get(&interview_id) {
            Some(answers) => answers,
            None => return Ok(McqTally::default()),
        };
        Ok(McqTally {
            answered: answers.len() as u32,
            correct: answers.values().filter(|c| **c).count() as u32,
        })
    }
}

/// Status compare-and-set: returns -1 if missing, 0 on status mismatch, 1 on write.
/// ARGV[3..] are extra field/value pairs written in the same step.
const CAS_STATUS_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'status')
if not current then
    return -1
end
if current ~= ARGV[1] then
    return 0
end
redis.call('HSET', KEYS[1], 'status', ARGV[2])
for i = 3, #ARGV, 2 do
    redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
return 1
";

/// Redis-backed interview store; each interview is a hash
#[derive(Clone)]
pub struct RedisInterviewStore {
    conn: ConnectionManager,
}

impl RedisInterviewStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn from_hash(interview_id: Uuid, fields: &HashMap<String, String>) -> Result<Interview> {
        let status = fields
            .get("status")
            .ok_or_else(|| not_found(interview_id))?
            .parse::<InterviewStatus>()?;
        let created_at = fields
            .get("created_at")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Interview {
            id: interview_id,
            status,
            total_score: fields.get("total_score").and_then(|v| v.parse().ok()),
            max_score: fields.get("max_score").and_then(|v| v.parse().ok()),
            is_passed: fields.get("is_passed").and_then(|v| v.parse().ok()),
            created_at,
        })
    }

    async fn compare_and_set(
        &self,
        interview_id: Uuid,
        from: InterviewStatus,
        to: InterviewStatus,
        extra: &[(&str, String)],
    ) -> Result<Interview> {
        let mut conn = self.conn.clone();
        let script = ::redis::Script::new(CAS_STATUS_SCRIPT);
        let mut invocation = script.key(interview_key(&interview_id));
        invocation.arg(from.as_str()).arg(to.as_str());
        for (field, value) in extra {
            invocation.arg(*field).arg(value);
        }
        let outcome: i32 = invocation.invoke_async(&mut conn).await?;

        match outcome {
            1 => self.get(interview_id).await,
            0 => {
                let current = self.get(interview_id).await?;
                Err(stale_status(interview_id, from, current.status))
            }
            _ => Err(not_found(interview_id)),
        }
    }
}

#[async_trait]
impl InterviewStore for RedisInterviewStore {
    async fn create(&self, interview: Interview) -> Result<Interview> {
        let key = interview_key(&interview.id);
        let mut conn = self.conn.clone();
        let created: bool = conn.hset_nx(&key, "status", interview.status.as_str()).await?;
        if !created {
            return Err(GraderError::Conflict(format!(
                "interview {} already exists",
                interview.id
            )));
        }
        let _: () = conn
            .hset(&key, "created_at", interview.created_at.to_rfc3339())
            .await?;
        Ok(interview)
    }

    async fn get(&self, interview_id: Uuid) -> Result<Interview> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(interview_key(&interview_id)).await?;
        if fields.is_empty() {
            return Err(not_found(interview_id));
        }
        Self::from_hash(interview_id, &fields)
    }

    async fn transition(
        &self,
        interview_id: Uuid,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Interview> {
        check_transition(interview_id, from, to)?;
        self.compare_and_set(interview_id, from, to, &[]).await
    }

    async fn complete_with_score(&self, interview_id: Uuid, score: InterviewScore) -> Result<Interview> {
        self.compare_and_set(
            interview_id,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            &[
                ("total_score", score.total_score.to_string()),
                ("max_score", score.max_score.to_string()),
                ("is_passed", score.is_passed.to_string()),
            ],
        )
        .await
    }

    async fn record_mcq_answer(&self, answer: McqAnswer) -> Result<()> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(interview_key(&answer.interview_id)).await?;
        if !exists {
            return Err(not_found(answer.interview_id));
        }
        let flag = if answer.is_correct { "1" } else { "0" };
        let _: () = conn
            .hset(
                mcq_answers_key(&answer.interview_id),
                answer.question_id.to_string(),
                flag,
            )
            .await?;
        Ok(())
    }

    async fn mcq_tally(&self, interview_id: Uuid) -> Result<McqTally> {
        let mut conn = self.conn.clone();
        let flags: Vec<String> = conn.hvals(mcq_answers_key(&interview_id)).await?;
        Ok(McqTally {
            answered: flags.len() as u32,
            correct: flags.iter().filter(|f| f.as_str() == "1").count() as u32,
        })
    }
}
