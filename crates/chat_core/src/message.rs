use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One content fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "text")]
    Text { text: String },
    /// Anything the stream carries that is not text (tool calls, files, ...).
    /// Kept so snapshots round-trip, ignored by rendering.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn assistant_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Role::Assistant,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Concatenation of the text parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::Other => None,
            })
            .collect()
    }

    /// Stable render key: the id, or `{role}-{index}` when the stream gave none.
    ///
    /// The fallback shifts when messages are inserted or removed mid-list.
    pub fn key(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}-{}", self.role.as_str(), index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_non_text_parts() {
        let message = Message {
            id: None,
            role: Role::Assistant,
            parts: vec![
                Part::Text {
                    text: "Hello, ".into(),
                },
                Part::Other,
                Part::Text {
                    text: "world".into(),
                },
            ],
        };
        assert_eq!(message.text(), "Hello, world");
    }

    #[test]
    fn key_falls_back_to_role_and_index() {
        let message = Message {
            id: None,
            role: Role::User,
            parts: Vec::new(),
        };
        assert_eq!(message.key(4), "user-4");
        assert_eq!(Message::user_text("abc", "hi").key(4), "abc");
    }
}
