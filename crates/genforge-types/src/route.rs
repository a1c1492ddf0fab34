//! Routing decision types

use crate::CodeGenType;
use serde::{Deserialize, Serialize};

/// Where a route decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    User,
    Heuristic,
    Llm,
}

impl std::fmt::Display for RouteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteSource::User => write!(f, "user"),
            RouteSource::Heuristic => write!(f, "heuristic"),
            RouteSource::Llm => write!(f, "llm"),
        }
    }
}

/// Chosen generation mode for a prompt; transient, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    pub code_gen_type: CodeGenType,
    pub reason: String,
    pub source: RouteSource,
}

impl RouteDecision {
    pub fn new(code_gen_type: CodeGenType, reason: impl Into<String>, source: RouteSource) -> Self {
        Self {
            code_gen_type,
            reason: reason.into(),
            source,
        }
    }
}
