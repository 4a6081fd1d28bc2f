use std::collections::HashMap;
use std::path::Path;

use chat_core::SourceRecord;
use serde::Deserialize;

use crate::{ChatError, FailureKind};

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Citation sources of one assistant message; empty when it has none.
    async fn sources_for(&self, message_key: &str) -> Result<Vec<SourceRecord>, ChatError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceFixture {
    Shared(Vec<SourceRecord>),
    PerMessage(HashMap<String, Vec<SourceRecord>>),
}

/// Sources served from a JSON fixture: either one list shared by every
/// message or an object keyed by message key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSourceProvider {
    shared: Vec<SourceRecord>,
    per_message: HashMap<String, Vec<SourceRecord>>,
}

impl StaticSourceProvider {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn shared(sources: Vec<SourceRecord>) -> Self {
        Self {
            shared: sources,
            per_message: HashMap::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ChatError> {
        let fixture: SourceFixture = serde_json::from_str(raw)
            .map_err(|err| ChatError::new(FailureKind::Protocol, err.to_string()))?;
        Ok(match fixture {
            SourceFixture::Shared(shared) => Self::shared(shared),
            SourceFixture::PerMessage(per_message) => Self {
                shared: Vec::new(),
                per_message,
            },
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ChatError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ChatError::new(FailureKind::Io, format!("{}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}

#[async_trait::async_trait]
impl SourceProvider for StaticSourceProvider {
    async fn sources_for(&self, message_key: &str) -> Result<Vec<SourceRecord>, ChatError> {
        Ok(self
            .per_message
            .get(message_key)
            .cloned()
            .unwrap_or_else(|| self.shared.clone()))
    }
}
