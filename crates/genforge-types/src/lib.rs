//! Genforge Types - Pure data types shared across the pipeline
//!
//! This crate contains only serializable value types with no async runtime
//! or filesystem dependencies: generation modes, route decisions, version
//! index entries and the mixed content/progress stream items.

pub mod event;
pub mod route;
pub mod sse;
pub mod version;

pub use event::*;
pub use route::*;
pub use sse::*;
pub use version::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Rejected textual value for one of the closed enums in this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseValueError {
    #[error("unsupported code_gen_type: {0}")]
    CodeGenType(String),

    #[error("unsupported edit_mode: {0}")]
    EditMode(String),
}

/// Generation mode of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeGenType {
    Html,
    MultiFile,
    VueProject,
}

impl CodeGenType {
    /// Get all supported modes
    pub fn all() -> &'static [CodeGenType] {
        &[
            CodeGenType::Html,
            CodeGenType::MultiFile,
            CodeGenType::VueProject,
        ]
    }

    /// Get the wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeGenType::Html => "html",
            CodeGenType::MultiFile => "multi_file",
            CodeGenType::VueProject => "vue_project",
        }
    }

    /// Name of the system prompt template used to generate this mode
    pub fn system_prompt_name(&self) -> &'static str {
        match self {
            CodeGenType::Html => "codegen-html-system-prompt.txt",
            CodeGenType::MultiFile => "codegen-multi-file-system-prompt.txt",
            CodeGenType::VueProject => "codegen-vue-project-system-prompt.txt",
        }
    }

    /// Execution route family chosen by the workflow router
    pub fn route_family(&self) -> &'static str {
        match self {
            CodeGenType::Html => "simple",
            CodeGenType::MultiFile | CodeGenType::VueProject => "project",
        }
    }

    /// Whether the mode produces a file tree rather than a single page
    pub fn is_multi_file(&self) -> bool {
        !matches!(self, CodeGenType::Html)
    }
}

impl std::fmt::Display for CodeGenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CodeGenType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        CodeGenType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ParseValueError::CodeGenType(s.to_string()))
    }
}

/// Materialization policy for a regeneration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Wipe non-reserved content, then write
    #[default]
    Full,
    /// Merge new files over the existing tree
    Incremental,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::Full => "full",
            EditMode::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = ParseValueError;

    /// Case and surrounding whitespace are ignored; an empty value means `full`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "full" => Ok(EditMode::Full),
            "incremental" => Ok(EditMode::Incremental),
            _ => Err(ParseValueError::EditMode(s.to_string())),
        }
    }
}
