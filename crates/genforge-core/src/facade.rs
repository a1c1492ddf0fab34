//! Streaming generation facade
//!
//! Composes prompt guarding, the model token stream, code extraction and
//! materialization into one call that yields content chunks and
//! `file_saver` progress events.

use crate::error::{GenforgeError, Result};
use crate::materializer::FileMaterializer;
use crate::model::ModelClient;
use crate::parser;
use crate::prompt::{with_edit_mode_instruction, PromptGuard, PromptLoader};
use crate::stream::GenerationStream;
use futures::StreamExt;
use genforge_types::{CodeGenType, EditMode, Phase, ProgressEvent};
use std::sync::Arc;
use tracing::{debug, info};

/// Tool name on materialization progress events
pub const FILE_SAVER_TOOL: &str = "file_saver";

/// Guarded prompt pair ready for the model
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Clone)]
pub struct GenerationFacade {
    client: Arc<dyn ModelClient>,
    prompts: PromptLoader,
    guard: PromptGuard,
    materializer: FileMaterializer,
}

impl GenerationFacade {
    pub fn new(
        client: Arc<dyn ModelClient>,
        prompts: PromptLoader,
        guard: PromptGuard,
        materializer: FileMaterializer,
    ) -> Self {
        Self {
            client,
            prompts,
            guard,
            materializer,
        }
    }

    pub fn materializer(&self) -> &FileMaterializer {
        &self.materializer
    }

    /// Resolve the template and guard the prompt; touches no network
    pub fn prepare(
        &self,
        code_gen_type: CodeGenType,
        user_message: &str,
        edit_mode: EditMode,
    ) -> Result<PreparedPrompt> {
        let system_prompt = self.prompts.load(code_gen_type.system_prompt_name())?;
        let guarded = self.guard.check(user_message)?;
        Ok(PreparedPrompt {
            system_prompt,
            user_prompt: with_edit_mode_instruction(&guarded, edit_mode),
        })
    }

    /// Generate, parse and save one artifact
    ///
    /// Content chunks are forwarded as they arrive. Parsing and writing only
    /// start once the model stream is exhausted, so dropping the returned
    /// stream early never leaves partial writes.
    pub fn generate(
        &self,
        app_id: u64,
        user_message: &str,
        code_gen_type: CodeGenType,
        edit_mode: EditMode,
    ) -> GenerationStream {
        let prepared = self.prepare(code_gen_type, user_message, edit_mode);
        let client = self.client.clone();
        let materializer = self.materializer.clone();

        GenerationStream::spawn(move |emitter| async move {
            let prepared = prepared?;
            info!("Generating {} for app {} ({})", code_gen_type, app_id, edit_mode);

            let mut tokens = client
                .stream_chat(&prepared.system_prompt, &prepared.user_prompt)
                .await?;
            let mut full_text = String::new();
            while let Some(chunk) = tokens.next().await {
                let chunk = chunk?;
                if chunk.is_empty() {
                    continue;
                }
                full_text.push_str(&chunk);
                if !emitter.content(chunk).await {
                    debug!("Consumer left during generation for app {}", app_id);
                    return Ok(());
                }
            }
            drop(tokens);

            let text = full_text.trim();
            if text.is_empty() {
                return Err(GenforgeError::system("empty model response"));
            }
            let parsed = parser::parse(code_gen_type, text)?;

            emitter
                .send(ProgressEvent::tool(
                    FILE_SAVER_TOOL,
                    Phase::Start,
                    format!("saving {} file(s)", parsed.file_count()),
                ))
                .await;

            let (written, saved) = tokio::task::spawn_blocking(move || {
                let mut written = Vec::new();
                let saved = materializer.save_with(
                    code_gen_type,
                    app_id,
                    &parsed,
                    edit_mode,
                    &mut |path| written.push(path.to_string()),
                );
                (written, saved)
            })
            .await?;

            for path in written {
                emitter
                    .send(ProgressEvent::tool(FILE_SAVER_TOOL, Phase::Delta, path))
                    .await;
            }
            let output_dir = saved?;

            emitter
                .send(ProgressEvent::tool(
                    FILE_SAVER_TOOL,
                    Phase::End,
                    format!("saved to {}", output_dir.display()),
                ))
                .await;
            Ok(())
        })
    }
}
