use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{GraderError, Result};

/// Languages a candidate can submit in.
/// Closed set: the judge language table must cover every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::Cpp, Language::Java];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = GraderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" => Ok(Language::Python),
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            other => Err(GraderError::Validation(format!(
                "unsupported language '{}' (expected python, cpp or java)",
                other
            ))),
        }
    }
}

/// Canonical grading outcome for one (submission, test case) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    CompilationError,
    RuntimeError,
    PresentationError,
    InternalError,
    Pending,
}

impl Verdict {
    /// Map a judge status description onto the canonical verdict.
    ///
    /// The judge reports runtime failures with a signal suffix
    /// (`Runtime Error (SIGSEGV)`, `Runtime Error (NZEC)`, ...), queue states
    /// as `In Queue` / `Processing`. Anything unrecognised is an internal error.
    pub fn from_judge_status(description: &str) -> Verdict {
        let description = description.trim();
        match description {
            "Accepted" => Verdict::Accepted,
            "Wrong Answer" => Verdict::WrongAnswer,
            "Time Limit Exceeded" => Verdict::TimeLimitExceeded,
            "Memory Limit Exceeded" => Verdict::MemoryLimitExceeded,
            "Compilation Error" => Verdict::CompilationError,
            "Presentation Error" => Verdict::PresentationError,
            "In Queue" | "Processing" => Verdict::Pending,
            s if s.starts_with("Runtime Error") => Verdict::RuntimeError,
            _ => Verdict::InternalError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "ACCEPTED",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Verdict::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Verdict::CompilationError => "COMPILATION_ERROR",
            Verdict::RuntimeError => "RUNTIME_ERROR",
            Verdict::PresentationError => "PRESENTATION_ERROR",
            Verdict::InternalError => "INTERNAL_ERROR",
            Verdict::Pending => "PENDING",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Per-language template a candidate's snippet is inserted into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterCode {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub starter: String,
    #[serde(default)]
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingQuestion {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub points: u32,
    pub time_limit_secs: f64,
    pub memory_limit_kb: u64,
    #[serde(default)]
    pub statement: String,
    /// Keyed by the closed `Language` enum, so an unknown language key
    /// fails deserialization instead of surfacing per submission.
    pub templates: BTreeMap<Language, StarterCode>,
    pub test_cases: Vec<TestCase>,
}

impl CodingQuestion {
    /// Parse and validate a question document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let question: CodingQuestion = serde_json::from_str(raw)
            .map_err(|e| GraderError::Validation(format!("invalid question document: {}", e)))?;
        question.validate()?;
        Ok(question)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0) {
            return Err(GraderError::Validation(format!(
                "question {} has a non-positive time limit",
                self.id
            )));
        }
        if self.templates.is_empty() {
            return Err(GraderError::Validation(format!(
                "question {} has no starter-code templates",
                self.id
            )));
        }
        if self.test_cases.is_empty() {
            return Err(GraderError::Validation(format!(
                "question {} has no test cases",
                self.id
            )));
        }
        let mut seen = HashSet::new();
        for tc in &self.test_cases {
            if !seen.insert(tc.id) {
                return Err(GraderError::Validation(format!(
                    "question {} has duplicate test case id {}",
                    self.id, tc.id
                )));
            }
        }
        Ok(())
    }

    pub fn template(&self, language: Language) -> Result<&StarterCode> {
        self.templates.get(&language).ok_or_else(|| {
            GraderError::Validation(format!(
                "question {} has no {} template",
                self.id, language
            ))
        })
    }

    pub fn test_case(&self, test_case_id: Uuid) -> Result<&TestCase> {
        self.test_cases
            .iter()
            .find(|tc| tc.id == test_case_id)
            .ok_or_else(|| GraderError::NotFound(format!("test case {}", test_case_id)))
    }

    /// First visible test case, used as the sample for "run" requests
    pub fn sample_case(&self) -> Result<&TestCase> {
        self.test_cases
            .iter()
            .find(|tc| !tc.is_hidden)
            .ok_or_else(|| {
                GraderError::NotFound(format!("visible test case for question {}", self.id))
            })
    }
}

/// Input to `SubmissionStore::create`; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub language: Language,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub language: Language,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub id: Uuid,
    pub code_submission_id: Uuid,
    pub test_case_id: Uuid,
    pub user_output: String,
    pub passed: bool,
    pub verdict: Verdict,
}

impl TestCaseResult {
    /// Row id is derived from its unique key, so an overwrite keeps the id
    /// no matter which writer wins.
    pub fn id_for(submission_id: Uuid, test_case_id: Uuid) -> Uuid {
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(submission_id.as_bytes());
        name[16..].copy_from_slice(test_case_id.as_bytes());
        Uuid::new_v5(&Uuid::NAMESPACE_OID, &name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionWithResults {
    #[serde(flatten)]
    pub submission: CodeSubmission,
    pub results: Vec<TestCaseResult>,
}

impl SubmissionWithResults {
    pub fn passed_count(&self) -> u32 {
        self.results.iter().filter(|r| r.passed).count() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "SCHEDULED",
            InterviewStatus::InProgress => "IN_PROGRESS",
            InterviewStatus::Completed => "COMPLETED",
            InterviewStatus::Cancelled => "CANCELLED",
            InterviewStatus::Expired => "EXPIRED",
        }
    }

    /// Lifecycle only moves forward; terminal states have no exits.
    pub fn can_transition_to(&self, next: InterviewStatus) -> bool {
        use InterviewStatus::{Cancelled, Completed, Expired, InProgress, Scheduled};
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (Scheduled, Expired)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Expired)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterviewStatus::Completed | InterviewStatus::Cancelled | InterviewStatus::Expired
        )
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = GraderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SCHEDULED" => Ok(InterviewStatus::Scheduled),
            "IN_PROGRESS" => Ok(InterviewStatus::InProgress),
            "COMPLETED" => Ok(InterviewStatus::Completed),
            "CANCELLED" => Ok(InterviewStatus::Cancelled),
            "EXPIRED" => Ok(InterviewStatus::Expired),
            other => Err(GraderError::Validation(format!(
                "unknown interview status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub status: InterviewStatus,
    pub total_score: Option<u32>,
    pub max_score: Option<u32>,
    pub is_passed: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Interview {
    pub fn scheduled(id: Uuid) -> Self {
        Self {
            id,
            status: InterviewStatus::Scheduled,
            total_score: None,
            max_score: None,
            is_passed: None,
            created_at: Utc::now(),
        }
    }
}

/// Final score written onto an interview at completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewScore {
    pub total_score: u32,
    pub max_score: u32,
    pub is_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqAnswer {
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqTally {
    pub answered: u32,
    pub correct: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Grade a single sample test case; nothing is persisted per test case
    Run { test_case_id: Option<Uuid> },
    /// Grade every test case of a stored submission
    Submit { submission_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingJob {
    pub id: Uuid,
    pub question_id: Uuid,
    pub language: Language,
    pub code: String,
    pub kind: JobKind,
}

/// Outcome of a run job, kept under a TTL for the editor to poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub job_id: Uuid,
    pub test_case_id: Option<Uuid>,
    pub verdict: Verdict,
    pub stdout: String,
    pub time_used: f64,
    pub error: Option<String>,
}
