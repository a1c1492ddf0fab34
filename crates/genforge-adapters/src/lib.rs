//! Model backend adapters for Genforge

mod openai;
pub mod sse;

pub use openai::OpenAiCompatibleClient;

use genforge_core::{ConcurrencyLimiter, LlmSettings, ModelClient, Result};
use std::sync::Arc;

/// Create the model client for the given settings
///
/// The limiter is owned by the caller so every client built from it shares
/// the same bound on in-flight upstream calls.
pub fn create_model_client(
    settings: &LlmSettings,
    limiter: ConcurrencyLimiter,
) -> Result<Arc<dyn ModelClient>> {
    Ok(Arc::new(OpenAiCompatibleClient::new(settings, limiter)?))
}

/// Create a client with its own limiter sized from `concurrency_limit`
pub fn create_default_model_client(settings: &LlmSettings) -> Result<Arc<dyn ModelClient>> {
    create_model_client(settings, ConcurrencyLimiter::new(settings.concurrency_limit))
}
