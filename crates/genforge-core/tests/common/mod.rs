use async_trait::async_trait;
use futures::stream;
use genforge_core::{
    ConcurrencyLimiter, GenerationPipeline, GenforgeError, ModelClient, Result, Settings,
    TokenStream,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Model double that replays canned chunks under a shared limiter
pub struct CannedModel {
    chunks: Vec<String>,
    limiter: ConcurrencyLimiter,
    calls: AtomicUsize,
}

impl CannedModel {
    pub fn new(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            limiter: ConcurrencyLimiter::new(1),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }
}

#[async_trait]
impl ModelClient for CannedModel {
    fn is_configured(&self) -> bool {
        true
    }

    async fn stream_chat(&self, _system_prompt: &str, _user_prompt: &str) -> Result<TokenStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.limiter.acquire().await;
        let chunks: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        let chunks = stream::iter(chunks);
        // The permit lives as long as the stream does.
        Ok(Box::pin(futures::StreamExt::map(chunks, move |c| {
            let _held = &permit;
            c
        })))
    }

    async fn chat(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenforgeError::system("classification not scripted"))
    }
}

pub fn pipeline(root: &Path, model: Arc<CannedModel>) -> GenerationPipeline {
    let settings = Settings {
        generated_root: root.to_path_buf(),
        ..Settings::default()
    };
    GenerationPipeline::from_settings(&settings, model)
}
