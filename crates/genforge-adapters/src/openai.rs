//! OpenAI-compatible chat-completion client

use crate::sse::SseDecoder;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use genforge_core::{
    ConcurrencyLimiter, GenforgeError, LimiterPermit, LlmSettings, ModelClient, Result,
    TokenStream, MAX_ERROR_DETAIL,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for any backend exposing `POST {base_url}/chat/completions`
pub struct OpenAiCompatibleClient {
    http: ReqwestClient,
    settings: LlmSettings,
    limiter: ConcurrencyLimiter,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: &LlmSettings, limiter: ConcurrencyLimiter) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenforgeError::system(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            settings: settings.clone(),
            limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim().trim_end_matches('/')
        )
    }

    fn ensure_configured(&self) -> Result<()> {
        if !self.settings.is_configured() {
            return Err(GenforgeError::system("model backend is not configured"));
        }
        Ok(())
    }

    async fn post(&self, system_prompt: &str, user_prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let payload = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": stream,
        });

        debug!("POST {} (stream={})", self.endpoint(), stream);
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.settings.api_key.trim())
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.settings.timeout_secs))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(MAX_ERROR_DETAIL).collect();
            return Err(GenforgeError::system(format!(
                "model request failed ({}): {}",
                status, detail
            )));
        }
        Ok(response)
    }

    async fn chat_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let _permit = self.limiter.acquire().await;
        let response = self.post(system_prompt, user_prompt, false).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| transport_error(&e, self.settings.timeout_secs))?;
        Ok(message_content(&body).unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn stream_chat(&self, system_prompt: &str, user_prompt: &str) -> Result<TokenStream> {
        self.ensure_configured()?;
        let permit = self.limiter.acquire().await;
        let response = self
            .post(system_prompt, user_prompt, self.settings.stream)
            .await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        if !self.settings.stream || is_json {
            let body: Value = response
                .json()
                .await
                .map_err(|e| transport_error(&e, self.settings.timeout_secs))?;
            drop(permit);
            let content = message_content(&body).filter(|c| !c.is_empty());
            return Ok(stream::iter(content.into_iter().map(Ok)).boxed());
        }

        let state = SseState {
            bytes: response.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
            timeout_secs: self.settings.timeout_secs,
            _permit: permit,
        };
        Ok(stream::unfold(state, next_token).boxed())
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.ensure_configured()?;
        let attempts = self.settings.retry_count + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.chat_once(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Model call attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| GenforgeError::system("model request failed")))
    }
}

/// Decoder state carried across polls; the permit is released when it drops
struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    timeout_secs: u64,
    _permit: LimiterPermit,
}

async fn next_token(mut state: SseState) -> Option<(Result<String>, SseState)> {
    loop {
        if let Some(token) = state.pending.pop_front() {
            return Some((Ok(token), state));
        }
        if state.finished {
            return None;
        }

        match state.bytes.next().await {
            Some(Ok(chunk)) => {
                state.pending.extend(state.decoder.feed(&chunk));
                state.finished = state.decoder.is_done();
            }
            Some(Err(e)) => {
                state.finished = true;
                state.pending.clear();
                let err = transport_error(&e, state.timeout_secs);
                return Some((Err(err), state));
            }
            None => {
                state.finished = true;
                state.pending.extend(state.decoder.finish());
            }
        }
    }
}

/// `choices[0].message.content` of a non-streaming response
fn message_content(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn transport_error(e: &reqwest::Error, timeout_secs: u64) -> GenforgeError {
    if e.is_timeout() {
        GenforgeError::system(format!(
            "model request timed out, consider raising llm.timeout_secs (current={})",
            timeout_secs
        ))
    } else {
        GenforgeError::system(format!("model request network error: {}", e))
    }
}
