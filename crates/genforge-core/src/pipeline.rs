//! Caller-side orchestration of one chat turn
//!
//! Chooses the facade or the workflow runner, forwards every item, and
//! snapshots the artifact after a clean finish. A failed snapshot is logged
//! and never turns a successful generation into a failure.

use crate::config::Settings;
use crate::facade::GenerationFacade;
use crate::materializer::FileMaterializer;
use crate::model::ModelClient;
use crate::prompt::{PromptGuard, PromptLoader};
use crate::router::RoutingService;
use crate::stream::GenerationStream;
use crate::versions::{ArtifactTarget, VersionStore};
use crate::workflow::WorkflowRunner;
use futures::StreamExt;
use genforge_types::{CodeGenType, EditMode};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One user turn against an app
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub app_id: u64,
    pub code_gen_type: CodeGenType,
    pub edit_mode: EditMode,
    pub message: String,
    /// Initial prompt the app was created with, prepended to the message
    pub init_prompt: Option<String>,
    pub use_workflow: bool,
    pub snapshot: bool,
}

impl ChatRequest {
    pub fn new(app_id: u64, code_gen_type: CodeGenType, message: impl Into<String>) -> Self {
        Self {
            app_id,
            code_gen_type,
            edit_mode: EditMode::Full,
            message: message.into(),
            init_prompt: None,
            use_workflow: false,
            snapshot: true,
        }
    }

    /// Message sent to the model
    pub fn effective_prompt(&self) -> String {
        match self.init_prompt.as_deref().map(str::trim) {
            Some(init) if !init.is_empty() => format!("{}\n\n{}", init, self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GenerationPipeline {
    facade: GenerationFacade,
    workflow: WorkflowRunner,
    versions: VersionStore,
    router: Arc<RoutingService>,
}

impl GenerationPipeline {
    /// Wire every component from resolved settings and a model client
    pub fn from_settings(settings: &Settings, client: Arc<dyn ModelClient>) -> Self {
        let prompts = PromptLoader::new(settings.prompts_dir.clone());
        let materializer = FileMaterializer::new(settings.generated_root.clone());
        let facade = GenerationFacade::new(
            client.clone(),
            prompts.clone(),
            PromptGuard::new(&settings.guard),
            materializer.clone(),
        );

        Self {
            workflow: WorkflowRunner::new(facade.clone()),
            versions: VersionStore::new(materializer),
            router: Arc::new(RoutingService::new(client, prompts)),
            facade,
        }
    }

    pub fn facade(&self) -> &GenerationFacade {
        &self.facade
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn router(&self) -> &RoutingService {
        &self.router
    }

    /// Run one turn and snapshot on success
    pub fn chat(&self, request: ChatRequest) -> GenerationStream {
        let prompt = request.effective_prompt();
        let mut inner = if request.use_workflow {
            self.workflow
                .run(request.app_id, &prompt, request.code_gen_type, request.edit_mode)
        } else {
            self.facade
                .generate(request.app_id, &prompt, request.code_gen_type, request.edit_mode)
        };
        let versions = self.versions.clone();

        GenerationStream::spawn(move |emitter| async move {
            let mut failed = false;
            while let Some(item) = inner.next().await {
                failed |= item.as_error().is_some();
                if !emitter.send(item).await {
                    debug!("Consumer left chat for app {}", request.app_id);
                    return Ok(());
                }
            }

            if !failed && request.snapshot {
                let target = ArtifactTarget::new(request.code_gen_type, request.app_id);
                let message = request.message.clone();
                let edit_mode = request.edit_mode;
                let outcome = tokio::task::spawn_blocking(move || {
                    versions.create_snapshot(target, Some(message.as_str()), edit_mode)
                })
                .await;

                match outcome {
                    Ok(Ok(entry)) => info!(
                        "Snapshot v{} saved for app {}",
                        entry.version, request.app_id
                    ),
                    Ok(Err(e)) => warn!("Snapshot failed for app {}: {}", request.app_id, e),
                    Err(e) => warn!("Snapshot task failed for app {}: {}", request.app_id, e),
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedClient;
    use std::path::Path;
    use tempfile::TempDir;

    fn pipeline(client: ScriptedClient, root: &Path) -> (Arc<ScriptedClient>, GenerationPipeline) {
        let client = Arc::new(client);
        let settings = Settings {
            generated_root: root.to_path_buf(),
            ..Settings::default()
        };
        let pipeline = GenerationPipeline::from_settings(&settings, client.clone());
        (client, pipeline)
    }

    #[test]
    fn test_effective_prompt() {
        let mut request = ChatRequest::new(1, CodeGenType::Html, "add a footer");
        assert_eq!(request.effective_prompt(), "add a footer");
        request.init_prompt = Some("a bakery site".into());
        assert_eq!(request.effective_prompt(), "a bakery site\n\nadd a footer");
        request.init_prompt = Some("  ".into());
        assert_eq!(request.effective_prompt(), "add a footer");
    }

    #[tokio::test]
    async fn test_successful_turn_is_snapshotted() {
        let temp_dir = TempDir::new().unwrap();
        let (client, pipeline) = pipeline(ScriptedClient::streaming(&["<h1>x</h1>"]), temp_dir.path());

        let mut request = ChatRequest::new(8, CodeGenType::Html, "make a header");
        request.init_prompt = Some("bakery".into());
        let items = pipeline.chat(request).collect_items().await;
        assert!(items.iter().all(|i| i.as_error().is_none()));

        let target = ArtifactTarget::new(CodeGenType::Html, 8);
        let versions = pipeline.versions().list_snapshots(target);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].message.as_deref(), Some("make a header"));
        assert!(client.last_user_prompt().unwrap().starts_with("bakery\n\nmake a header"));
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_snapshotted() {
        let temp_dir = TempDir::new().unwrap();
        let (_client, pipeline) = pipeline(ScriptedClient::streaming(&[" "]), temp_dir.path());

        let items = pipeline
            .chat(ChatRequest::new(9, CodeGenType::Html, "page"))
            .collect_items()
            .await;
        assert!(items.last().unwrap().as_error().is_some());
        assert!(pipeline
            .versions()
            .list_snapshots(ArtifactTarget::new(CodeGenType::Html, 9))
            .is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let (_client, pipeline) = pipeline(ScriptedClient::streaming(&["<p>1</p>"]), temp_dir.path());

        let mut request = ChatRequest::new(10, CodeGenType::Html, "page");
        request.snapshot = false;
        request.use_workflow = true;
        let items = pipeline.chat(request).collect_items().await;
        assert!(items.iter().any(|i| i.as_progress().is_some()));
        assert!(pipeline
            .versions()
            .list_snapshots(ArtifactTarget::new(CodeGenType::Html, 10))
            .is_empty());
    }
}
