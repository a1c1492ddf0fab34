//! Staged workflow around the generation facade
//!
//! Adds named `workflow` progress events: `router`, a `parallel` advisory
//! stage (`asset_collector`, `quality_checker`) and `code_generator`, which
//! forwards the facade's items unchanged.

use crate::facade::GenerationFacade;
use crate::stream::GenerationStream;
use futures::StreamExt;
use genforge_types::{CodeGenType, EditMode, Phase, ProgressEvent, StreamItem};
use tracing::debug;

pub const ROUTER_NODE: &str = "router";
pub const PARALLEL_NODE: &str = "parallel";
pub const ASSET_COLLECTOR_NODE: &str = "asset_collector";
pub const QUALITY_CHECKER_NODE: &str = "quality_checker";
pub const CODE_GENERATOR_NODE: &str = "code_generator";

/// Prompts longer than this (in characters) get structured-output constraints
const LONG_PROMPT_CHARS: usize = 120;

const ASSET_KEYWORDS: &[&str] = &[
    "image",
    "icon",
    "logo",
    "photo",
    "picture",
    "illustration",
    "图片",
    "图标",
];

#[derive(Clone)]
pub struct WorkflowRunner {
    facade: GenerationFacade,
}

impl WorkflowRunner {
    pub fn new(facade: GenerationFacade) -> Self {
        Self { facade }
    }

    pub fn run(
        &self,
        app_id: u64,
        user_message: &str,
        code_gen_type: CodeGenType,
        edit_mode: EditMode,
    ) -> GenerationStream {
        let facade = self.facade.clone();
        let user_message = user_message.to_string();

        GenerationStream::spawn(move |emitter| async move {
            let node = |name: &str, phase: Phase, message: String| {
                StreamItem::from(ProgressEvent::workflow(name, phase, message))
            };

            emitter
                .send(node(ROUTER_NODE, Phase::Start, "selecting execution route".into()))
                .await;
            let route = code_gen_type.route_family();
            emitter
                .send(node(ROUTER_NODE, Phase::End, format!("route selected: {}", route)))
                .await;

            emitter
                .send(node(PARALLEL_NODE, Phase::Start, "planning assets and quality checks".into()))
                .await;
            let (assets, quality) =
                tokio::join!(collect_assets(&user_message), quality_plan(&user_message));
            emitter.send(node(ASSET_COLLECTOR_NODE, Phase::End, assets)).await;
            emitter.send(node(QUALITY_CHECKER_NODE, Phase::End, quality)).await;
            emitter
                .send(node(PARALLEL_NODE, Phase::End, "parallel stage complete".into()))
                .await;

            emitter
                .send(node(CODE_GENERATOR_NODE, Phase::Start, "running code generation".into()))
                .await;
            let mut inner = facade.generate(app_id, &user_message, code_gen_type, edit_mode);
            while let Some(item) = inner.next().await {
                let failed = item.as_error().is_some();
                if !emitter.send(item).await {
                    debug!("Consumer left during workflow for app {}", app_id);
                    return Ok(());
                }
                if failed {
                    return Ok(());
                }
            }
            emitter
                .send(node(CODE_GENERATOR_NODE, Phase::End, "code generation complete".into()))
                .await;
            Ok(())
        })
    }
}

/// Asset-need detection; advisory only
async fn collect_assets(user_message: &str) -> String {
    tokio::task::yield_now().await;
    let lowered = user_message.to_lowercase();
    if ASSET_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        "image needs detected, asset slots planned".to_string()
    } else {
        "no extra assets needed".to_string()
    }
}

/// Quality policy from prompt length; advisory only
async fn quality_plan(user_message: &str) -> String {
    tokio::task::yield_now().await;
    if user_message.chars().count() > LONG_PROMPT_CHARS {
        "long prompt, structured output constraints enabled".to_string()
    } else {
        "default quality checks enabled".to_string()
    }
}
