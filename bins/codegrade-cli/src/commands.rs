// CLI commands for managing Codegrade content
use anyhow::{Context, Result};
use codegrade_common::languages::{LanguageTable, LanguagesJson};
use codegrade_common::questions::{QuestionCatalog, RedisQuestionCatalog};
use codegrade_common::template;
use codegrade_common::types::{CodingQuestion, Language};
use std::fs;
use std::path::{Path, PathBuf};

/// Load and validate a question document
fn load_question(file: &str) -> Result<CodingQuestion> {
    let raw = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    let question =
        CodingQuestion::from_json(&raw).with_context(|| format!("Invalid question in {}", file))?;
    Ok(question)
}

/// Writes config/languages.json under `path` unless it already exists
pub fn write_default_languages(path: &Path) -> Result<Option<PathBuf>> {
    let config_dir = path.join("config");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;

    let languages_json_path = config_dir.join("languages.json");
    if languages_json_path.exists() {
        return Ok(None);
    }

    let json_content = serde_json::to_string_pretty(&LanguagesJson::builtin())
        .context("Failed to serialize languages.json")?;
    fs::write(&languages_json_path, json_content)
        .context("Failed to write languages.json")?;
    Ok(Some(languages_json_path))
}

/// Initialize a new Codegrade project
pub fn init_project(path: &str) -> Result<()> {
    println!("🚀 Initializing Codegrade project at: {}", path);

    let project_path = Path::new(path);
    let questions_dir = project_path.join("questions");
    fs::create_dir_all(&questions_dir)
        .with_context(|| format!("Failed to create directory: {}", questions_dir.display()))?;
    println!("  ✅ Created: questions");

    match write_default_languages(project_path)? {
        Some(_) => println!("  ✅ Created: config/languages.json"),
        None => println!("  ⚠️  Kept existing config/languages.json"),
    }

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Write a question: questions/<slug>.json");
    println!("  2. Check it: codegrade-cli validate-question --file questions/<slug>.json");
    println!("  3. Publish it: codegrade-cli publish-question --file questions/<slug>.json");

    Ok(())
}

/// List configured languages
pub fn list_languages(config: &str) -> Result<()> {
    let table = LanguageTable::load(Path::new(config))
        .with_context(|| format!("Failed to load {}", config))?;

    println!("📋 Configured languages:");
    for lang in table.list_languages() {
        println!(
            "  {:<8} judge id {:<4} {} ({})",
            lang.name.as_str(),
            lang.judge_language_id,
            lang.version,
            lang.file_extension
        );
    }
    Ok(())
}

/// One-line summary of a valid question
pub fn describe_question(question: &CodingQuestion) -> String {
    let hidden = question.test_cases.iter().filter(|tc| tc.is_hidden).count();
    let languages: Vec<&str> = question.templates.keys().map(Language::as_str).collect();
    format!(
        "{} [{:?}] {} test cases ({} hidden), languages: {}, time limit {}s",
        question.title,
        question.difficulty,
        question.test_cases.len(),
        hidden,
        languages.join(", "),
        question.time_limit_secs
    )
}

pub fn validate_question(file: &str) -> Result<()> {
    let question = load_question(file)?;
    println!("✅ {}", describe_question(&question));
    Ok(())
}

/// Assemble a snippet from disk into the full program text
pub fn assemble_from_files(file: &str, language: &str, code: &str) -> Result<String> {
    let question = load_question(file)?;
    let language: Language = language.parse()?;
    let snippet = fs::read_to_string(code).with_context(|| format!("Failed to read {}", code))?;
    let source = template::assemble(&question, language, &snippet)?;
    Ok(source)
}

pub fn assemble_source(file: &str, language: &str, code: &str) -> Result<()> {
    print!("{}", assemble_from_files(file, language, code)?);
    Ok(())
}

pub async fn publish_question(file: &str, redis_url: &str) -> Result<()> {
    let question = load_question(file)?;

    let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", redis_url))?;

    RedisQuestionCatalog::new(conn)
        .publish(&question)
        .await
        .context("Failed to publish question")?;

    println!("✅ Published {} ({})", question.title, question.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const QUESTION: &str = r#"{
        "id": "5b0c7a58-2d55-4a6e-9a55-3b2c3f3e1a01",
        "title": "Sum of Two",
        "difficulty": "EASY",
        "points": 10,
        "time_limit_secs": 2.0,
        "memory_limit_kb": 131072,
        "templates": {
            "python": {
                "starter": "class Solution:\n    def solve(self, a: int, b: int) -> int:",
                "footer": "a, b = map(int, input().split())\nprint(Solution().solve(a, b))"
            }
        },
        "test_cases": [
            {"id": "5b0c7a58-2d55-4a6e-9a55-3b2c3f3e1b01", "input": "2 3", "expected_output": "5"},
            {"id": "5b0c7a58-2d55-4a6e-9a55-3b2c3f3e1b02", "input": "40 2", "expected_output": "42", "is_hidden": true}
        ]
    }"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_default_languages_round_trip_through_table() {
        let dir = TempDir::new().unwrap();
        let written = write_default_languages(dir.path()).unwrap().unwrap();

        let table = LanguageTable::load(&written).unwrap();
        assert_eq!(table.judge_language_id(Language::Python), 71);
        assert_eq!(table.judge_language_id(Language::Cpp), 54);
        assert_eq!(table.judge_language_id(Language::Java), 62);

        // Second run keeps the existing file
        assert!(write_default_languages(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_describe_valid_question() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "q.json", QUESTION);
        let question = load_question(&file).unwrap();
        let summary = describe_question(&question);
        assert!(summary.contains("2 test cases (1 hidden)"));
        assert!(summary.contains("python"));
    }

    #[test]
    fn test_invalid_question_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "bad.json", &QUESTION.replace("\"python\"", "\"ruby\""));
        assert!(load_question(&file).is_err());
    }

    #[test]
    fn test_assemble_from_files() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "q.json", QUESTION);
        let code = write(&dir, "solution.py", "return a + b");

        let source = assemble_from_files(&file, "python", &code).unwrap();
        assert!(source.starts_with("from typing import List\n"));
        assert!(source.contains("\n        return a + b\n"));

        assert!(assemble_from_files(&file, "java", &code).is_err());
        assert!(assemble_from_files(&file, "ruby", &code).is_err());
    }
}
