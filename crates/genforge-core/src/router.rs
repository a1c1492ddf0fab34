//! Generation mode routing

use crate::error::{GenforgeError, Result};
use crate::model::ModelClient;
use crate::prompt::{PromptLoader, ROUTING_PROMPT_NAME};
use genforge_types::{CodeGenType, RouteDecision, RouteSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const VUE_KEYWORDS: &[&str] = &[
    "vue",
    "vite",
    "pinia",
    "router",
    "组件",
    "工程",
    "项目",
    "typescript",
    "ts",
    "npm",
];

const MULTI_FILE_KEYWORDS: &[&str] = &[
    "多文件",
    "多页面",
    "拆分",
    "目录结构",
    "模块化",
    "component",
    "css",
    "javascript",
    "js",
];

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

/// Picks a generation mode for a prompt; never fails
pub struct RoutingService {
    client: Arc<dyn ModelClient>,
    prompts: PromptLoader,
}

impl RoutingService {
    pub fn new(client: Arc<dyn ModelClient>, prompts: PromptLoader) -> Self {
        Self { client, prompts }
    }

    /// Explicit preference, else model classification, else keyword heuristic
    pub async fn route(&self, prompt: &str, preferred: Option<&str>) -> RouteDecision {
        if let Some(code_gen_type) = preferred
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse::<CodeGenType>().ok())
        {
            debug!("Using preferred mode {}", code_gen_type);
            return RouteDecision::new(
                code_gen_type,
                "generation mode explicitly requested",
                RouteSource::User,
            );
        }

        let heuristic = heuristic_route(prompt);
        if !self.client.is_configured() {
            return heuristic;
        }

        match self.classify(prompt).await {
            Ok(decision) => {
                info!("Routed to {} ({})", decision.code_gen_type, decision.source);
                decision
            }
            Err(e) => {
                warn!("Model routing failed, using heuristic: {}", e);
                heuristic
            }
        }
    }

    async fn classify(&self, prompt: &str) -> Result<RouteDecision> {
        let system_prompt = self.prompts.load(ROUTING_PROMPT_NAME)?;
        let text = self.client.chat(&system_prompt, prompt).await?;
        parse_classification(&text)
    }
}

/// Keyword routing: Vue terms first, then multi-file terms, else html
pub fn heuristic_route(prompt: &str) -> RouteDecision {
    let normalized = prompt.to_lowercase();

    if VUE_KEYWORDS.iter().any(|k| normalized.contains(k)) {
        return RouteDecision::new(
            CodeGenType::VueProject,
            "matched Vue project keywords",
            RouteSource::Heuristic,
        );
    }
    if MULTI_FILE_KEYWORDS.iter().any(|k| normalized.contains(k)) {
        return RouteDecision::new(
            CodeGenType::MultiFile,
            "matched multi-file keywords",
            RouteSource::Heuristic,
        );
    }
    RouteDecision::new(
        CodeGenType::Html,
        "defaulted to single-page html",
        RouteSource::Heuristic,
    )
}

fn parse_classification(text: &str) -> Result<RouteDecision> {
    let data = extract_json_object(text)
        .ok_or_else(|| GenforgeError::system("routing response carried no JSON object"))?;

    let field = |key: &str| {
        data.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let raw_type = field("codeGenType")
        .or_else(|| field("code_gen_type"))
        .unwrap_or("");
    let code_gen_type: CodeGenType = raw_type.parse()?;
    let reason = field("reason").unwrap_or("LLM routing");

    Ok(RouteDecision::new(code_gen_type, reason, RouteSource::Llm))
}

/// Pull a JSON object out of free text: fenced block, whole text, then outer braces
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let mut raw = text.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(inner) = JSON_FENCE.captures(raw).and_then(|c| c.get(1)) {
        raw = inner.as_str().trim();
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(raw) {
        return Some(map);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&raw[start..=end]) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}
