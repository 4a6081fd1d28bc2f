//! Streaming chat-completions client for the hosted model, used by the proxy.

use std::pin::Pin;
use std::time::Duration;

use chat_core::Message;
use chat_logging::{chat_debug, chat_info, chat_warn};
use eventsource_stream::Eventsource;
use futures_util::{stream, Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use crate::protocol::DONE_SENTINEL;
use crate::types::map_reqwest_error;
use crate::{ChatError, FailureKind};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Placeholder proxy left behind by local tooling; never usable.
const STALE_PROXY_MARKER: &str = "localhost:7890";

/// Text deltas of one completion, in arrival order.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Starts a completion for the conversation. Errors before the first byte
    /// are returned directly; later ones arrive inside the stream.
    async fn stream_completion(&self, messages: &[Message]) -> Result<CompletionStream, ChatError>;
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Proxy url worth using: non-blank and not the stale local default.
pub fn usable_proxy(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|url| !url.is_empty() && !url.contains(STALE_PROXY_MARKER))
}

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    settings: UpstreamSettings,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(settings: UpstreamSettings) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(proxy_url) = usable_proxy(settings.proxy.as_deref()) {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => {
                    chat_info!("upstream requests go through proxy {}", proxy_url);
                    builder = builder.proxy(proxy);
                }
                Err(err) => {
                    chat_warn!("ignoring proxy {}: {}", proxy_url, err);
                }
            }
        }
        let client = builder
            .build()
            .map_err(|err| ChatError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn has_api_key(&self) -> bool {
        self.settings
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    fn request_body(&self, messages: &[Message]) -> serde_json::Value {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(json!({ "role": "system", "content": self.settings.system_prompt }));
        for message in messages {
            wire.push(json!({ "role": message.role.as_str(), "content": message.text() }));
        }
        json!({
            "model": self.settings.model,
            "stream": true,
            "messages": wire,
        })
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn stream_completion(&self, messages: &[Message]) -> Result<CompletionStream, ChatError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ChatError::new(FailureKind::NotConfigured, "missing api key"))?;
        let endpoint = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = serde_json::to_vec(&self.request_body(messages))
            .map_err(|err| ChatError::new(FailureKind::Protocol, err.to_string()))?;

        chat_debug!("completion request with {} message(s)", messages.len());
        let response = self
            .client
            .post(&endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::new(
                FailureKind::HttpStatus(status.as_u16()),
                upstream_error_message(&text).unwrap_or_else(|| status.to_string()),
            ));
        }

        let events = Box::pin(response.bytes_stream().eventsource());
        let idle_timeout = self.settings.idle_timeout;
        let deltas = stream::unfold(Some(events), move |events| async move {
            let mut events = events?;
            loop {
                let next = match tokio::time::timeout(idle_timeout, events.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let err = ChatError::new(FailureKind::Timeout, "idle timeout waiting for SSE");
                        return Some((Err(err), None));
                    }
                };
                match next {
                    None => return None,
                    Some(Err(err)) => {
                        let err = ChatError::new(FailureKind::Protocol, err.to_string());
                        return Some((Err(err), None));
                    }
                    Some(Ok(event)) => {
                        if event.data.trim() == DONE_SENTINEL {
                            return None;
                        }
                        if let Some(content) = delta_content(&event.data) {
                            return Some((Ok(content), Some(events)));
                        }
                    }
                }
            }
        });
        Ok(Box::pin(deltas))
    }
}

/// `choices[0].delta.content` of one streamed chunk.
fn delta_content(data: &str) -> Option<String> {
    let chunk: serde_json::Value = serde_json::from_str(data).ok()?;
    chunk
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(ToOwned::to_owned)
}

/// `error.message` of an upstream error body, when it has one.
fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToOwned::to_owned)
}
