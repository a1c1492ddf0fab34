//! Configuration management for Genforge

use crate::error::{GenforgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["genforge.toml", "genforge.yaml", "genforge.json"];

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "GENFORGE";

/// Smallest prompt length the guard will ever truncate to
pub const MIN_PROMPT_LENGTH: usize = 256;

/// Resolved settings handed to the pipeline by the composition root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root under which `<codeGenType>_<appId>/` directories are created
    pub generated_root: PathBuf,
    /// Optional directory overriding the embedded prompt templates
    pub prompts_dir: Option<PathBuf>,
    pub llm: LlmSettings,
    pub guard: GuardSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generated_root: PathBuf::from("./generated"),
            prompts_dir: None,
            llm: LlmSettings::default(),
            guard: GuardSettings::default(),
        }
    }
}

/// Model backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Request an SSE token stream instead of a single JSON body
    pub stream: bool,
    pub timeout_secs: u64,
    /// Extra immediate attempts for the non-streaming classification call
    pub retry_count: u32,
    /// Maximum simultaneous upstream calls
    pub concurrency_limit: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            stream: true,
            timeout_secs: 120,
            retry_count: 1,
            concurrency_limit: 4,
        }
    }
}

impl LlmSettings {
    /// Whether enough is set to reach a backend
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Prompt guard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub blocked_keywords: Vec<String>,
    pub max_prompt_length: usize,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            blocked_keywords: vec![
                "rm -rf".to_string(),
                "drop database".to_string(),
                "drop table".to_string(),
                "format c:".to_string(),
                "mkfs".to_string(),
            ],
            max_prompt_length: 8000,
        }
    }
}

impl GuardSettings {
    /// Configured maximum, never below `MIN_PROMPT_LENGTH`
    pub fn effective_max_length(&self) -> usize {
        self.max_prompt_length.max(MIN_PROMPT_LENGTH)
    }
}

impl Settings {
    /// Find configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Load settings from an optional file, layered under `GENFORGE_*` variables
    ///
    /// Sections are separated by `__` in variable names, e.g.
    /// `GENFORGE_LLM__API_KEY`; `GENFORGE_GUARD__BLOCKED_KEYWORDS` is a
    /// comma-separated list.
    pub fn load(config_path: Option<&Path>) -> Result<Settings> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(GenforgeError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("guard.blocked_keywords")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(GenforgeError::Config(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(GenforgeError::Config("llm.model must not be empty".to_string()));
        }
        if self.generated_root.as_os_str().is_empty() {
            return Err(GenforgeError::Config(
                "generated_root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid_and_unconfigured() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.llm.is_configured());
        assert!(settings
            .guard
            .blocked_keywords
            .iter()
            .any(|k| k == "rm -rf"));
    }

    #[test]
    fn test_prompt_length_floor() {
        let guard = GuardSettings {
            blocked_keywords: vec![],
            max_prompt_length: 10,
        };
        assert_eq!(guard.effective_max_length(), MIN_PROMPT_LENGTH);
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("genforge.toml");
        std::fs::write(
            &path,
            r#"
generated_root = "/tmp/genforge-out"

[llm]
base_url = "http://localhost:9000/v1"
api_key = "sk-test"
timeout_secs = 30

[guard]
blocked_keywords = ["shutdown"]
max_prompt_length = 1000
"#,
        )?;

        assert_eq!(Settings::find_config_file(temp_dir.path()), Some(path.clone()));

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.generated_root, PathBuf::from("/tmp/genforge-out"));
        assert!(settings.llm.is_configured());
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.guard.blocked_keywords, vec!["shutdown".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/genforge.toml"))).unwrap_err();
        assert!(matches!(err, GenforgeError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.llm.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }
}
