/// Verdict Evaluator - Reconciles judge output with declared limits
///
/// **Core Responsibility:**
/// Turn one raw judge report into one canonical verdict.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP, Redis or templates
/// - Pure and total: (judge report, time limit, expected output) → verdict
///
/// **Decision Precedence (first match wins):**
/// 1. time used > time limit            → TIME_LIMIT_EXCEEDED
/// 2. memory > 131072 KB                 → MEMORY_LIMIT_EXCEEDED
/// 3. judge says "Accepted", outputs equal after trim → ACCEPTED
/// 4. judge says "Accepted", outputs differ           → WRONG_ANSWER
/// 5. otherwise the judge's own status, mapped onto `Verdict`
///
/// The caller's limits outrank the judge: a run the judge accepted can
/// still be TLE/MLE here.
///
/// **Normalization Rules:**
/// - Trim leading/trailing whitespace: YES
/// - Internal whitespace, case: preserved, exact match
/// - Floating-point tolerance: NO (known limitation)

use codegrade_common::types::Verdict;
use serde::Serialize;

use crate::judge::JudgeResult;

/// Fixed memory ceiling: 128 MB
pub const MEMORY_CEILING_KB: u64 = 131_072;

const JUDGE_ACCEPTED: &str = "Accepted";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub normalized_stdout: String,
    pub time_used: f64,
}

impl Evaluation {
    pub fn passed(&self) -> bool {
        self.verdict.is_accepted()
    }
}

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Missing, unparsable or non-finite times count as zero
fn parse_time(raw: Option<&str>) -> f64 {
    raw.and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .unwrap_or(0.0)
}

pub fn evaluate(result: &JudgeResult, time_limit_secs: f64, expected_output: &str) -> Evaluation {
    let time_used = parse_time(result.time.as_deref());
    let stdout = result
        .stdout
        .as_deref()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    let actual = normalize_output(&stdout);

    let verdict = if time_used > time_limit_secs {
        Verdict::TimeLimitExceeded
    } else if result.memory_kb.map_or(false, |m| m > MEMORY_CEILING_KB) {
        Verdict::MemoryLimitExceeded
    } else if result.status_description.trim() == JUDGE_ACCEPTED {
        if actual.as_bytes() == normalize_output(expected_output).as_bytes() {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        }
    } else {
        Verdict::from_judge_status(&result.status_description)
    };

    Evaluation {
        verdict,
        normalized_stdout: actual.to_string(),
        time_used,
    }
}
