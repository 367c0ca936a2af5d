/// Question Catalog - Read side of coding question content
///
/// **Properties:**
/// - `publish` validates before storing; the CLI loads documents through it
/// - Questions read back from Redis are validated again
///
/// Authoring lives outside this system.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;

use crate::error::{GraderError, Result};
use crate::redis::question_key;
use crate::types::CodingQuestion;

#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn get(&self, question_id: Uuid) -> Result<CodingQuestion>;

    /// Validates before storing; replaces an existing question with the same id
    async fn publish(&self, question: &CodingQuestion) -> Result<()>;
}

fn not_found(question_id: Uuid) -> GraderError {
    GraderError::NotFound(format!("question {}", question_id))
}

#[derive(Debug, Default)]
pub struct MemoryQuestionCatalog {
    questions: RwLock<HashMap<Uuid, CodingQuestion>>,
}

impl MemoryQuestionCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionCatalog for MemoryQuestionCatalog {
    async fn get(&self, question_id: Uuid) -> Result<CodingQuestion> {
        self.questions
            .read()
            .await
            .get(&question_id)
            .cloned()
            .ok_or_else(|| not_found(question_id))
    }

    async fn publish(&self, question: &CodingQuestion) -> Result<()> {
        question.validate()?;
        self.questions
            .write()
            .await
            .insert(question.id, question.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct RedisQuestionCatalog {
    conn: ConnectionManager,
}

impl RedisQuestionCatalog {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl QuestionCatalog for RedisQuestionCatalog {
    async fn get(&self, question_id: Uuid) -> Result<CodingQuestion> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(question_key(&question_id)).await?;
        match payload {
            // Re-validated on load so a hand-edited document cannot reach the pipeline
            Some(raw) => CodingQuestion::from_json(&raw),
            None => Err(not_found(question_id)),
        }
    }

    async fn publish(&self, question: &CodingQuestion) -> Result<()> {
        question.validate()?;
        let payload = serde_json::to_string(question)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(question_key(&question.id), payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, Language, StarterCode, TestCase};

    fn question(test_cases: Vec<TestCase>) -> CodingQuestion {
        CodingQuestion {
            id: Uuid::new_v4(),
            title: "Echo".to_string(),
            difficulty: Difficulty::Medium,
            points: 5,
            time_limit_secs: 1.0,
            memory_limit_kb: 65_536,
            statement: "Print the input".to_string(),
            templates: [(Language::Cpp, StarterCode::default())].into_iter().collect(),
            test_cases,
        }
    }

    #[tokio::test]
    async fn test_publish_then_get() {
        let catalog = MemoryQuestionCatalog::new();
        let q = question(vec![TestCase {
            id: Uuid::new_v4(),
            input: "x".to_string(),
            expected_output: "x".to_string(),
            is_hidden: false,
        }]);
        catalog.publish(&q).await.unwrap();
        assert_eq!(catalog.get(q.id).await.unwrap(), q);
    }

    #[tokio::test]
    async fn test_publish_rejects_question_without_tests() {
        let catalog = MemoryQuestionCatalog::new();
        let q = question(Vec::new());
        assert!(matches!(
            catalog.publish(&q).await,
            Err(GraderError::Validation(_))
        ));
        assert!(matches!(catalog.get(q.id).await, Err(GraderError::NotFound(_))));
    }
}
