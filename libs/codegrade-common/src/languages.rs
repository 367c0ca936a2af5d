// Language table: maps each supported language to its judge language id.
// Loaded from config/languages.json; every language must appear exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{GraderError, Result};
use crate::types::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: Language,
    pub version: String,
    /// Identifier the judge uses to pick a compiler/interpreter
    pub judge_language_id: u32,
    pub file_extension: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesJson {
    pub languages: Vec<LanguageConfig>,
}

impl LanguagesJson {
    pub fn builtin() -> Self {
        Self {
            languages: vec![
                LanguageConfig {
                    name: Language::Python,
                    version: "3.8.1".to_string(),
                    judge_language_id: 71,
                    file_extension: ".py".to_string(),
                },
                LanguageConfig {
                    name: Language::Cpp,
                    version: "GCC 9.2.0".to_string(),
                    judge_language_id: 54,
                    file_extension: ".cpp".to_string(),
                },
                LanguageConfig {
                    name: Language::Java,
                    version: "OpenJDK 13.0.1".to_string(),
                    judge_language_id: 62,
                    file_extension: ".java".to_string(),
                },
            ],
        }
    }
}

/// Exhaustive lookup table over `Language`
#[derive(Debug, Clone)]
pub struct LanguageTable {
    configs: BTreeMap<Language, LanguageConfig>,
}

impl LanguageTable {
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            GraderError::Validation(format!(
                "failed to read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: LanguagesJson = serde_json::from_str(raw)
            .map_err(|e| GraderError::Validation(format!("failed to parse languages.json: {}", e)))?;
        Self::from_configs(parsed.languages)
    }

    pub fn from_configs(languages: Vec<LanguageConfig>) -> Result<Self> {
        let mut configs = BTreeMap::new();
        for lang in languages {
            let name = lang.name;
            if configs.insert(name, lang).is_some() {
                return Err(GraderError::Validation(format!(
                    "language '{}' is configured more than once",
                    name
                )));
            }
        }

        let missing: Vec<String> = Language::ALL
            .iter()
            .filter(|l| !configs.contains_key(l))
            .map(|l| l.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GraderError::Validation(format!(
                "languages.json is missing: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { configs })
    }

    pub fn builtin() -> Self {
        let configs = LanguagesJson::builtin()
            .languages
            .into_iter()
            .map(|c| (c.name, c))
            .collect();
        Self { configs }
    }

    pub fn get_config(&self, language: Language) -> &LanguageConfig {
        // Construction guarantees every variant is present
        &self.configs[&language]
    }

    pub fn judge_language_id(&self, language: Language) -> u32 {
        self.get_config(language).judge_language_id
    }

    pub fn list_languages(&self) -> Vec<&LanguageConfig> {
        self.configs.values().collect()
    }
}
