use crate::lifecycle::LifecycleStatus;
use crate::message::Role;
use crate::streaming::{split_incomplete_tail, StreamingTail};

pub const ERROR_HEADER: &str = "**消息发送失败**";
pub const THINKING_TEXT: &str = "正在思考...";
pub const FALLBACK_ERROR_TEXT: &str = "请稍后重试";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// More tokens may still arrive; trailing incomplete constructs become
    /// placeholders.
    Updating,
    Final,
}

/// What a single assistant bubble shows on this render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBody {
    Error { content: String },
    Markdown { content: String, status: RenderStatus },
    Thinking,
}

impl RenderBody {
    /// Markdown split into the part that is safe to render and the
    /// unterminated tail, if any. Final and error bodies are never split.
    pub fn streaming_tail(&self) -> Option<StreamingTail<'_>> {
        match self {
            RenderBody::Markdown {
                content,
                status: RenderStatus::Updating,
            } => Some(split_incomplete_tail(content)),
            _ => None,
        }
    }

    pub fn markdown(&self) -> Option<&str> {
        match self {
            RenderBody::Error { content } | RenderBody::Markdown { content, .. } => Some(content),
            RenderBody::Thinking => None,
        }
    }
}

/// Picks the body for one render pass. First match wins: error, then any
/// content or an in-flight update, then the thinking placeholder.
pub fn select_body(
    message_text: &str,
    is_updating: bool,
    error_message: Option<&str>,
) -> RenderBody {
    if let Some(error) = error_message.filter(|e| !e.is_empty()) {
        return RenderBody::Error {
            content: format!("{ERROR_HEADER}\n\n{error}"),
        };
    }
    if !message_text.is_empty() || is_updating {
        return RenderBody::Markdown {
            content: message_text.to_string(),
            status: if is_updating {
                RenderStatus::Updating
            } else {
                RenderStatus::Final
            },
        };
    }
    RenderBody::Thinking
}

/// True for the last message when it is an assistant message and the turn is
/// still in flight.
pub fn is_updating(status: LifecycleStatus, is_last: bool, role: Role) -> bool {
    status.is_loading() && is_last && role == Role::Assistant
}
