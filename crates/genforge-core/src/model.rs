//! Model backend seam
//!
//! Pipeline code only sees [`ModelClient`]; the HTTP implementation lives in
//! `genforge-adapters` and tests substitute scripted clients.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Ordered text chunks from the model; ends after the last chunk or an error
pub type TokenStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Whether a backend is configured at all
    fn is_configured(&self) -> bool;

    /// Stream a completion for one system + user message pair
    async fn stream_chat(&self, system_prompt: &str, user_prompt: &str) -> Result<TokenStream>;

    /// Complete a short non-streaming exchange
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
