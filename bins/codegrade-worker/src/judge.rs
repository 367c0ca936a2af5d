/// Judge Client - Protocol client for the external execution sandbox
///
/// **Core Responsibility:**
/// Send assembled source + stdin to the judge and return its raw report.
///
/// **Critical Architectural Boundary:**
/// - The judge sandboxes and runs the code; this client only speaks HTTP
/// - Client does NOT apply limits or compare outputs (evaluator's job)
/// - One request per call, no retries (at-most-once)
///
/// **Wire Protocol:**
/// `POST {base}/submissions?base64_encoded=true&wait=true`
/// body `{language_id, source_code, stdin}` (base64), auth token header,
/// response `{stdout?, time?, memory?, status: {description}}`.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use codegrade_common::config::JudgeConfig;
use codegrade_common::error::{GraderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Raw judge report for one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeResult {
    pub stdout: Option<Vec<u8>>,
    /// Seconds, as reported (e.g. "0.80")
    pub time: Option<String>,
    pub memory_kb: Option<u64>,
    pub status_description: String,
}

/// Execution backend seam; the pipeline only sees this trait
#[async_trait]
pub trait Judge: Send + Sync {
    async fn submit(&self, language_id: u32, source: &str, stdin: &str) -> Result<JudgeResult>;
}

#[derive(Debug, Serialize)]
struct SubmissionRequest {
    language_id: u32,
    source_code: String,
    stdin: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    description: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    time: Option<String>,
    memory: Option<f64>,
    status: SubmissionStatus,
}

/// Decode a base64 field; the judge wraps long payloads across lines
fn decode_field(raw: &str) -> Result<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GraderError::ExternalService(format!("undecodable judge stdout: {}", e)))
}

impl SubmissionResponse {
    fn into_result(self) -> Result<JudgeResult> {
        let stdout = self.stdout.as_deref().map(decode_field).transpose()?;
        let memory_kb = self
            .memory
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| m.round() as u64);

        Ok(JudgeResult {
            stdout,
            time: self.time,
            memory_kb,
            status_description: self.status.description,
        })
    }
}

/// HTTP judge client; configuration is injected at construction
pub struct JudgeClient {
    http: reqwest::Client,
    config: JudgeConfig,
}

impl JudgeClient {
    pub fn new(config: JudgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| GraderError::ExternalService(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn submissions_url(&self) -> String {
        format!(
            "{}/submissions?base64_encoded=true&wait=true",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Judge for JudgeClient {
    async fn submit(&self, language_id: u32, source: &str, stdin: &str) -> Result<JudgeResult> {
        let body = SubmissionRequest {
            language_id,
            source_code: general_purpose::STANDARD.encode(source),
            stdin: general_purpose::STANDARD.encode(stdin),
        };

        let mut request = self.http.post(self.submissions_url()).json(&body);
        if let Some(token) = &self.config.auth_token {
            request = request.header(self.config.auth_header.as_str(), token.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| GraderError::ExternalService(format!("judge unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GraderError::ExternalService(format!(
                "judge returned HTTP {}",
                status
            )));
        }

        let payload: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| GraderError::ExternalService(format!("unparsable judge response: {}", e)))?;

        debug!(
            language_id,
            status = %payload.status.description,
            time = ?payload.time,
            memory = ?payload.memory,
            "Judge responded"
        );

        payload.into_result()
    }
}
