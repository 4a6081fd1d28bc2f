use std::fmt;

use chat_core::{LifecycleStatus, Message, SourceRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    LoginFinished {
        success: bool,
        error: Option<String>,
    },
    Status(LifecycleStatus),
    /// Full conversation snapshot after a change.
    Messages(Vec<Message>),
    StreamFailed(String),
    SourcesLoaded {
        message_key: String,
        sources: Vec<SourceRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ChatError {
    pub kind: FailureKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The peer answered but the payload did not follow the stream format.
    Protocol,
    /// The model reported an error inside the stream.
    Model,
    Io,
    NotConfigured,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::Model => write!(f, "model error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::NotConfigured => write!(f, "not configured"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        return ChatError::new(FailureKind::Timeout, err.to_string());
    }
    ChatError::new(FailureKind::Network, err.to_string())
}
