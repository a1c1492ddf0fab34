//! System prompt templates and user prompt guarding

use crate::config::GuardSettings;
use crate::error::{GenforgeError, Result};
use genforge_types::EditMode;
use std::path::PathBuf;
use tracing::debug;

/// Template used by the routing classification call
pub const ROUTING_PROMPT_NAME: &str = "codegen-routing-system-prompt.txt";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        "codegen-html-system-prompt.txt",
        include_str!("../prompts/codegen-html-system-prompt.txt"),
    ),
    (
        "codegen-multi-file-system-prompt.txt",
        include_str!("../prompts/codegen-multi-file-system-prompt.txt"),
    ),
    (
        "codegen-vue-project-system-prompt.txt",
        include_str!("../prompts/codegen-vue-project-system-prompt.txt"),
    ),
    (
        ROUTING_PROMPT_NAME,
        include_str!("../prompts/codegen-routing-system-prompt.txt"),
    ),
];

const FULL_MODE_SUFFIX: &str = "\n\n[Edit mode: full]\n\
Return the complete output. Include every file in full; anything you leave out will be removed.";

const INCREMENTAL_MODE_SUFFIX: &str = "\n\n[Edit mode: incremental]\n\
Return only the files that change. Emit each changed file as \
<file path=\"relative/path.ext\">...</file> with its complete new content and omit unchanged files.";

/// Loads system prompt templates by name
#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    /// Resolve a template: override directory first, then the embedded copy
    pub fn load(&self, name: &str) -> Result<String> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!("Loading prompt {} from {}", name, path.display());
                return Ok(std::fs::read_to_string(&path)?);
            }
        }

        BUILTIN_PROMPTS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| GenforgeError::system(format!("prompt not found: {}", name)))
    }
}

/// Screens user prompts before any network activity
#[derive(Debug, Clone)]
pub struct PromptGuard {
    blocked_keywords: Vec<String>,
    max_length: usize,
}

impl PromptGuard {
    pub fn new(settings: &GuardSettings) -> Self {
        Self {
            blocked_keywords: settings
                .blocked_keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            max_length: settings.effective_max_length(),
        }
    }

    /// Reject blocked prompts, then truncate to the configured length
    pub fn check(&self, prompt: &str) -> Result<String> {
        let lowered = prompt.to_lowercase();
        if let Some(term) = self
            .blocked_keywords
            .iter()
            .find(|k| lowered.contains(&k.to_lowercase()))
        {
            return Err(GenforgeError::params(format!(
                "prompt blocked by safety rule: {}",
                term
            )));
        }

        Ok(match prompt.char_indices().nth(self.max_length) {
            Some((idx, _)) => {
                debug!("Truncating prompt to {} characters", self.max_length);
                prompt[..idx].to_string()
            }
            None => prompt.to_string(),
        })
    }
}

/// Append the edit-mode instruction to a user prompt
pub fn with_edit_mode_instruction(prompt: &str, edit_mode: EditMode) -> String {
    let suffix = match edit_mode {
        EditMode::Full => FULL_MODE_SUFFIX,
        EditMode::Incremental => INCREMENTAL_MODE_SUFFIX,
    };
    format!("{}{}", prompt, suffix)
}
