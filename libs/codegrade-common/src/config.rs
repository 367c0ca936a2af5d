// Service configuration, read from the environment once at startup and
// passed explicitly into constructors.

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PASS_THRESHOLD: f64 = 0.6;

/// Connection settings for the external execution judge
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub auth_header: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:2358".to_string(),
            auth_token: None,
            auth_header: "X-Auth-Token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradingConfig {
    /// Client-side bound on one judge round-trip, independent of question limits
    pub judge_timeout: Duration,
    /// Upper bound on concurrent judge calls for one submission
    pub max_parallel_tests: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            judge_timeout: Duration::from_millis(15_000),
            max_parallel_tests: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub pass_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraderConfig {
    pub redis_url: String,
    pub judge: JudgeConfig,
    pub grading: GradingConfig,
    pub scoring: ScoringConfig,
    pub api_bind_addr: String,
    pub run_result_ttl_secs: u64,
    pub languages_config: String,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            judge: JudgeConfig::default(),
            grading: GradingConfig::default(),
            scoring: ScoringConfig::default(),
            api_bind_addr: "0.0.0.0:3000".to_string(),
            run_result_ttl_secs: 86_400,
            languages_config: "config/languages.json".to_string(),
        }
    }
}

impl GraderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let judge_timeout_ms = parse_or(
            &lookup,
            "JUDGE_TIMEOUT_MS",
            defaults.grading.judge_timeout.as_millis() as u64,
        );
        let max_parallel_tests =
            parse_or(&lookup, "MAX_PARALLEL_TESTS", defaults.grading.max_parallel_tests).max(1);
        let pass_threshold = parse_or(&lookup, "PASS_THRESHOLD", defaults.scoring.pass_threshold);

        Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            judge: JudgeConfig {
                base_url: lookup("JUDGE_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.judge.base_url),
                auth_token: lookup("JUDGE_AUTH_TOKEN").filter(|t| !t.is_empty()),
                auth_header: lookup("JUDGE_AUTH_HEADER").unwrap_or(defaults.judge.auth_header),
            },
            grading: GradingConfig {
                judge_timeout: Duration::from_millis(judge_timeout_ms),
                max_parallel_tests,
            },
            scoring: ScoringConfig {
                pass_threshold: if (0.0..=1.0).contains(&pass_threshold) {
                    pass_threshold
                } else {
                    defaults.scoring.pass_threshold
                },
            },
            api_bind_addr: lookup("API_BIND_ADDR").unwrap_or(defaults.api_bind_addr),
            run_result_ttl_secs: parse_or(&lookup, "RUN_RESULT_TTL_SECS", defaults.run_result_ttl_secs),
            languages_config: lookup("LANGUAGES_CONFIG").unwrap_or(defaults.languages_config),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
                default
            }
        },
        None => default,
    }
}
