use std::time::Duration;

use chat_core::Message;
use chat_logging::{chat_debug, chat_warn};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::protocol::{ChatRequest, ErrorBody, UiChunk, DONE_SENTINEL};
use crate::types::map_reqwest_error;
use crate::{ChatError, FailureKind};

const CHAT_PATH: &str = "api/chat";

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two stream frames.
    pub idle_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts the conversation and hands every decoded chunk to `on_chunk`
    /// until the stream ends.
    async fn stream_reply(
        &self,
        messages: &[Message],
        on_chunk: &mut (dyn FnMut(UiChunk) + Send),
    ) -> Result<(), ChatError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    endpoint: Url,
    settings: TransportSettings,
    client: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(server_url: &str, settings: TransportSettings) -> Result<Self, ChatError> {
        let endpoint = endpoint_url(server_url, CHAT_PATH)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ChatError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            endpoint,
            settings,
            client,
        })
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpChatTransport {
    async fn stream_reply(
        &self,
        messages: &[Message],
        on_chunk: &mut (dyn FnMut(UiChunk) + Send),
    ) -> Result<(), ChatError> {
        let body = serde_json::to_vec(&ChatRequest {
            messages: messages.to_vec(),
        })
        .map_err(|err| ChatError::new(FailureKind::Protocol, err.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(ChatError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        loop {
            let next = tokio::time::timeout(self.settings.idle_timeout, events.next())
                .await
                .map_err(|_| ChatError::new(FailureKind::Timeout, "stream went silent"))?;
            let event = match next {
                None => return Ok(()),
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    return Err(ChatError::new(FailureKind::Protocol, err.to_string()));
                }
            };
            if event.data.trim() == DONE_SENTINEL {
                chat_debug!("chat stream done");
                return Ok(());
            }
            match serde_json::from_str::<UiChunk>(&event.data) {
                Ok(chunk) => on_chunk(chunk),
                Err(err) => chat_warn!("skipping undecodable chunk: {}", err),
            }
        }
    }
}

/// Joins a path onto the server root, keeping any base path the root has.
pub(crate) fn endpoint_url(server_url: &str, path: &str) -> Result<Url, ChatError> {
    let mut base = server_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|root| root.join(path))
        .map_err(|err| ChatError::new(FailureKind::InvalidUrl, format!("{server_url}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        assert_eq!(
            endpoint_url("http://localhost:3000", CHAT_PATH).unwrap().as_str(),
            "http://localhost:3000/api/chat"
        );
        assert_eq!(
            endpoint_url("https://host/app", CHAT_PATH).unwrap().as_str(),
            "https://host/app/api/chat"
        );
        assert_eq!(
            endpoint_url("not a url", CHAT_PATH).unwrap_err().kind,
            FailureKind::InvalidUrl
        );
    }
}
