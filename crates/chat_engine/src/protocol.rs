//! UI-message stream: the JSON chunks the chat endpoint emits as SSE `data:`
//! frames, and the request/response bodies of both endpoints.

use std::collections::VecDeque;

use chat_core::Message;
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::upstream::CompletionStream;

/// Data of the frame that terminates every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

const TEXT_PART_ID: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiChunk {
    Start {
        #[serde(
            rename = "messageId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        message_id: Option<String>,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    Finish,
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
    /// Step markers, tool calls and anything else this client does not draw.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct ChunkState {
    text_id: String,
    queue: VecDeque<UiChunk>,
    deltas: Option<CompletionStream>,
}

/// Wraps upstream text deltas into one assistant message: `start`,
/// `text-start`, the deltas, then `text-end` + `finish`. An upstream error
/// ends the stream with a single `error` chunk instead.
pub fn ui_chunk_stream(
    message_id: String,
    deltas: CompletionStream,
) -> impl Stream<Item = UiChunk> + Send {
    let text_id = TEXT_PART_ID.to_string();
    let queue = VecDeque::from([
        UiChunk::Start {
            message_id: Some(message_id),
        },
        UiChunk::TextStart {
            id: text_id.clone(),
        },
    ]);
    let state = ChunkState {
        text_id,
        queue,
        deltas: Some(deltas),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.queue.pop_front() {
                return Some((chunk, state));
            }
            let deltas = state.deltas.as_mut()?;
            match deltas.next().await {
                Some(Ok(delta)) => {
                    if !delta.is_empty() {
                        state.queue.push_back(UiChunk::TextDelta {
                            id: state.text_id.clone(),
                            delta,
                        });
                    }
                }
                Some(Err(err)) => {
                    state.deltas = None;
                    state.queue.push_back(UiChunk::Error {
                        error_text: err.message,
                    });
                }
                None => {
                    state.deltas = None;
                    state.queue.push_back(UiChunk::TextEnd {
                        id: state.text_id.clone(),
                    });
                    state.queue.push_back(UiChunk::Finish);
                }
            }
        }
    })
}
