/// Submission Store - Persistence for submissions and per-test-case results
///
/// **Invariants:**
/// - At most one TestCaseResult per (submission, test case); a second write overwrites
/// - Deleting a submission deletes its results
/// - Listings are ordered most recent `submitted_at` first
///
/// Two implementations: `RedisSubmissionStore` for deployments and
/// `MemorySubmissionStore` for tests and single-process use.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;

use crate::error::{GraderError, Result};
use crate::redis::{interview_submissions_key, question_submissions_key, results_key, submission_key};
use crate::types::{
    CodeSubmission, NewSubmission, SubmissionWithResults, TestCaseResult, Verdict,
};

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Assigns id and submitted_at
    async fn create(&self, submission: NewSubmission) -> Result<CodeSubmission>;

    async fn get(&self, submission_id: Uuid) -> Result<CodeSubmission>;

    /// Explicit edit path; id and submitted_at are kept
    async fn update_code(&self, submission_id: Uuid, code: String) -> Result<CodeSubmission>;

    /// Upsert keyed by (submission_id, test_case_id)
    async fn record_result(
        &self,
        submission_id: Uuid,
        test_case_id: Uuid,
        verdict: Verdict,
        user_output: String,
        passed: bool,
    ) -> Result<TestCaseResult>;

    async fn get_by_interview(&self, interview_id: Uuid) -> Result<Vec<CodeSubmission>>;

    async fn get_by_interview_and_question(
        &self,
        interview_id: Uuid,
        question_id: Uuid,
    ) -> Result<Vec<CodeSubmission>>;

    async fn get_with_results(&self, submission_id: Uuid) -> Result<SubmissionWithResults>;

    /// Cascades to results
    async fn delete(&self, submission_id: Uuid) -> Result<()>;
}

fn not_found(submission_id: Uuid) -> GraderError {
    GraderError::NotFound(format!("submission {}", submission_id))
}

fn make_result(
    submission_id: Uuid,
    test_case_id: Uuid,
    verdict: Verdict,
    user_output: String,
    passed: bool,
) -> TestCaseResult {
    TestCaseResult {
        id: TestCaseResult::id_for(submission_id, test_case_id),
        code_submission_id: submission_id,
        test_case_id,
        user_output,
        passed,
        verdict,
    }
}

fn new_submission(submission: NewSubmission) -> CodeSubmission {
    CodeSubmission {
        id: Uuid::new_v4(),
        interview_id: submission.interview_id,
        question_id: submission.question_id,
        language: submission.language,
        code: submission.code,
        submitted_at: Utc::now(),
    }
}

#[derive(Debug)]
struct StoredSubmission {
    submission: CodeSubmission,
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
    results: BTreeMap<Uuid, TestCaseResult>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_seq: u64,
    submissions: HashMap<Uuid, StoredSubmission>,
}

impl MemoryState {
    fn newest_first<'a, I>(entries: I) -> Vec<CodeSubmission>
    where
        I: Iterator<Item = &'a StoredSubmission>,
    {
        let mut entries: Vec<&StoredSubmission> = entries.collect();
        entries.sort_by(|a, b| {
            b.submission
                .submitted_at
                .cmp(&a.submission.submitted_at)
                .then(b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|e| e.submission.clone()).collect()
    }
}

/// In-process store guarded by one lock; every operation is atomic
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    state: RwLock<MemoryState>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of result rows across all submissions
    pub async fn result_count(&self) -> usize {
        let state = self.state.read().await;
        state.submissions.values().map(|s| s.results.len()).sum()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<CodeSubmission> {
        let submission = new_submission(submission);
        let mut state = self.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.submissions.insert(
            submission.id,
            StoredSubmission {
                submission: submission.clone(),
                seq,
                results: BTreeMap::new(),
            },
        );
        Ok(submission)
    }

    async fn get(&self, submission_id: Uuid) -> Result<CodeSubmission> {
        let state = self.state.read().await;
        state
            .submissions
            .get(&submission_id)
            .map(|s| s.submission.clone())
            .ok_or_else(|| not_found(submission_id))
    }

    async fn update_code(&self, submission_id: Uuid, code: String) -> Result<CodeSubmission> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .get_mut(&submission_id)
            .ok_or_else(|| not_found(submission_id))?;
        let updated = CodeSubmission {
            code,
            ..stored.submission.clone()
        };
        stored.submission = updated.clone();
        Ok(updated)
    }

    async fn record_result(
        &self,
        submission_id: Uuid,
        test_case_id: Uuid,
        verdict: Verdict,
        user_output: String,
        passed: bool,
    ) -> Result<TestCaseResult> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .get_mut(&submission_id)
            .ok_or_else(|| not_found(submission_id))?;
        let result = make_result(submission_id, test_case_id, verdict, user_output, passed);
        stored.results.insert(test_case_id, result.clone());
        Ok(result)
    }

    async fn get_by_interview(&self, interview_id: Uuid) -> Result<Vec<CodeSubmission>> {
        let state = self.state.read().await;
        Ok(MemoryState::newest_first(
            state
                .submissions
                .values()
                .filter(|s| s.submission.interview_id == interview_id),
        ))
    }

    async fn get_by_interview_and_question(
        &self,
        interview_id: Uuid,
        question_id: Uuid,
    ) -> Result<Vec<CodeSubmission>> {
        let state = self.state.read().await;
        Ok(MemoryState::newest_first(state.submissions.values().filter(
            |s| s.submission.interview_id == interview_id && s.submission.question_id == question_id,
        )))
    }

    async fn get_with_results(&self, submission_id: Uuid) -> Result<SubmissionWithResults> {
        let state = self.state.read().await;
        let stored = state
            .submissions
            .get(&submission_id)
            .ok_or_else(|| not_found(submission_id))?;
        Ok(SubmissionWithResults {
            submission: stored.submission.clone(),
            results: stored.results.values().cloned().collect(),
        })
    }

    async fn delete(&self, submission_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .submissions
            .remove(&submission_id)
            .map(|_| ())
            .ok_or_else(|| not_found(submission_id))
    }
}

/// Atomic "record only if the submission still exists"; keeps a concurrent
/// delete from leaving orphaned result rows behind.
const RECORD_RESULT_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[2], ARGV[1], ARGV[2])
return 1
";

/// Same guard for the edit path
const UPDATE_SUBMISSION_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('SET', KEYS[1], ARGV[1])
return 1
";

/// Redis-backed store
///
/// Layout (see `crate::redis` for key names):
/// - submission JSON under its own key
/// - results in a hash keyed by test case id (HSET is the upsert)
/// - two sorted sets indexed by submitted_at micros for listings
#[derive(Clone)]
pub struct RedisSubmissionStore {
    conn: ConnectionManager,
}

impl RedisSubmissionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn load_many(&self, ids: Vec<String>) -> Result<Vec<CodeSubmission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let keys: Vec<String> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .map(|id| submission_key(&id))
            .collect();
        let payloads: Vec<Option<String>> = ::redis::cmd("MGET").arg(&keys).query_async(&mut conn).await?;

        let mut submissions = Vec::with_capacity(payloads.len());
        for payload in payloads.into_iter().flatten() {
            submissions.push(serde_json::from_str(&payload)?);
        }
        Ok(submissions)
    }
}

#[async_trait]
impl SubmissionStore for RedisSubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<CodeSubmission> {
        let submission = new_submission(submission);
        let payload = serde_json::to_string(&submission)?;
        let score = submission.submitted_at.timestamp_micros();
        let member = submission.id.to_string();

        let mut conn = self.conn.clone();
        let _: () = ::redis::pipe()
            .atomic()
            .set(submission_key(&submission.id), payload)
            .ignore()
            .zadd(interview_submissions_key(&submission.interview_id), &member, score)
            .ignore()
            .zadd(
                question_submissions_key(&submission.interview_id, &submission.question_id),
                &member,
                score,
            )
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(submission)
    }

    async fn get(&self, submission_id: Uuid) -> Result<CodeSubmission> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(submission_key(&submission_id)).await?;
        match payload {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Err(not_found(submission_id)),
        }
    }

    async fn update_code(&self, submission_id: Uuid, code: String) -> Result<CodeSubmission> {
        let current = self.get(submission_id).await?;
        let updated = CodeSubmission { code, ..current };
        let payload = serde_json::to_string(&updated)?;

        let mut conn = self.conn.clone();
        let written: i32 = ::redis::Script::new(UPDATE_SUBMISSION_SCRIPT)
            .key(submission_key(&submission_id))
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;
        if written == 0 {
            return Err(not_found(submission_id));
        }
        Ok(updated)
    }

    async fn record_result(
        &self,
        submission_id: Uuid,
        test_case_id: Uuid,
        verdict: Verdict,
        user_output: String,
        passed: bool,
    ) -> Result<TestCaseResult> {
        let result = make_result(submission_id, test_case_id, verdict, user_output, passed);
        let payload = serde_json::to_string(&result)?;

        let mut conn = self.conn.clone();
        let written: i32 = ::redis::Script::new(RECORD_RESULT_SCRIPT)
            .key(submission_key(&submission_id))
            .key(results_key(&submission_id))
            .arg(test_case_id.to_string())
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;
        if written == 0 {
            return Err(not_found(submission_id));
        }
        Ok(result)
    }

    async fn get_by_interview(&self, interview_id: Uuid) -> Result<Vec<CodeSubmission>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrevrange(interview_submissions_key(&interview_id), 0, -1)
            .await?;
        self.load_many(ids).await
    }

    async fn get_by_interview_and_question(
        &self,
        interview_id: Uuid,
        question_id: Uuid,
    ) -> Result<Vec<CodeSubmission>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrevrange(question_submissions_key(&interview_id, &question_id), 0, -1)
            .await?;
        self.load_many(ids).await
    }

    async fn get_with_results(&self, submission_id: Uuid) -> Result<SubmissionWithResults> {
        let submission = self.get(submission_id).await?;

        let mut conn = self.conn.clone();
        let rows: HashMap<String, String> = conn.hgetall(results_key(&submission_id)).await?;
        let mut results = rows
            .values()
            .map(|payload| serde_json::from_str::<TestCaseResult>(payload))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        results.sort_by_key(|r| r.test_case_id);

        Ok(SubmissionWithResults { submission, results })
    }

    async fn delete(&self, submission_id: Uuid) -> Result<()> {
        let submission = self.get(submission_id).await?;
        let member = submission_id.to_string();

        let mut conn = self.conn.clone();
        let (deleted,): (i32,) = ::redis::pipe()
            .atomic()
            .del(submission_key(&submission_id))
            .del(results_key(&submission_id))
            .ignore()
            .zrem(interview_submissions_key(&submission.interview_id), &member)
            .ignore()
            .zrem(
                question_submissions_key(&submission.interview_id, &submission.question_id),
                &member,
            )
            .ignore()
            .query_async(&mut conn)
            .await?;

        if deleted == 0 {
            // Lost a race with another delete
            return Err(not_found(submission_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language;
    use std::sync::Arc;

    fn new_sub(interview_id: Uuid, question_id: Uuid) -> NewSubmission {
        NewSubmission {
            interview_id,
            question_id,
            language: Language::Python,
            code: "return 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        let store = MemorySubmissionStore::new();
        let before = Utc::now();
        let a = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        let b = store.create(new_sub(a.interview_id, a.question_id)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.submitted_at >= before);
        assert_eq!(store.get(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_record_result_overwrites_same_key() {
        let store = MemorySubmissionStore::new();
        let sub = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        let tc = Uuid::new_v4();

        let first = store
            .record_result(sub.id, tc, Verdict::Pending, String::new(), false)
            .await
            .unwrap();
        let second = store
            .record_result(sub.id, tc, Verdict::Accepted, "5".to_string(), true)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let with_results = store.get_with_results(sub.id).await.unwrap();
        assert_eq!(with_results.results.len(), 1);
        assert_eq!(with_results.results[0].verdict, Verdict::Accepted);
        assert_eq!(with_results.results[0].user_output, "5");
        assert_eq!(store.result_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_regrades_never_duplicate() {
        let store = Arc::new(MemorySubmissionStore::new());
        let sub_id = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap().id;
        let tc = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let verdict = if i % 2 == 0 { Verdict::Accepted } else { Verdict::WrongAnswer };
                store
                    .record_result(sub_id, tc, verdict, i.to_string(), verdict.is_accepted())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.result_count().await, 1);
    }

    #[tokio::test]
    async fn test_record_result_for_missing_submission() {
        let store = MemorySubmissionStore::new();
        let err = store
            .record_result(Uuid::new_v4(), Uuid::new_v4(), Verdict::Accepted, String::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, GraderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        let store = MemorySubmissionStore::new();
        let interview = Uuid::new_v4();
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();

        let a = store.create(new_sub(interview, q1)).await.unwrap();
        let b = store.create(new_sub(interview, q2)).await.unwrap();
        let c = store.create(new_sub(interview, q1)).await.unwrap();
        store.create(new_sub(Uuid::new_v4(), q1)).await.unwrap();

        let all: Vec<Uuid> = store
            .get_by_interview(interview)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec![c.id, b.id, a.id]);

        let for_q1: Vec<Uuid> = store
            .get_by_interview_and_question(interview, q1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(for_q1, vec![c.id, a.id]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_results() {
        let store = MemorySubmissionStore::new();
        let sub = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        store
            .record_result(sub.id, Uuid::new_v4(), Verdict::Accepted, "1".to_string(), true)
            .await
            .unwrap();
        store
            .record_result(sub.id, Uuid::new_v4(), Verdict::WrongAnswer, "2".to_string(), false)
            .await
            .unwrap();

        store.delete(sub.id).await.unwrap();

        assert_eq!(store.result_count().await, 0);
        assert!(matches!(store.get_with_results(sub.id).await, Err(GraderError::NotFound(_))));
        assert!(store.get_by_interview(sub.interview_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_submission_is_not_found() {
        let store = MemorySubmissionStore::new();
        assert!(matches!(
            store.delete(Uuid::new_v4()).await,
            Err(GraderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_code_keeps_identity() {
        let store = MemorySubmissionStore::new();
        let sub = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        let updated = store.update_code(sub.id, "return 2".to_string()).await.unwrap();
        assert_eq!(updated.id, sub.id);
        assert_eq!(updated.submitted_at, sub.submitted_at);
        assert_eq!(store.get(sub.id).await.unwrap().code, "return 2");
    }

    async fn redis_store() -> RedisSubmissionStore {
        let client = ::redis::Client::open("redis://127.0.0.1:6379").expect("Failed to create Redis client");
        let conn = ConnectionManager::new(client).await.expect("Failed to connect to Redis");
        RedisSubmissionStore::new(conn)
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_upsert_and_cascade() {
        let store = redis_store().await;
        let sub = store.create(new_sub(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
        let tc = Uuid::new_v4();

        store.record_result(sub.id, tc, Verdict::Pending, String::new(), false).await.unwrap();
        store.record_result(sub.id, tc, Verdict::Accepted, "ok".to_string(), true).await.unwrap();

        let with_results = store.get_with_results(sub.id).await.unwrap();
        assert_eq!(with_results.results.len(), 1);
        assert!(with_results.results[0].passed);

        store.delete(sub.id).await.unwrap();
        assert!(matches!(
            store.record_result(sub.id, tc, Verdict::Accepted, String::new(), true).await,
            Err(GraderError::NotFound(_))
        ));
        assert!(store.get_by_interview(sub.interview_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_listing_order() {
        let store = redis_store().await;
        let interview = Uuid::new_v4();
        let question = Uuid::new_v4();
        let a = store.create(new_sub(interview, question)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let b = store.create(new_sub(interview, question)).await.unwrap();

        let ids: Vec<Uuid> = store
            .get_by_interview_and_question(interview, question)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
