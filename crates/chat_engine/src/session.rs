use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use chat_core::{LifecycleStatus, Message, Part, Role};
use chat_logging::{chat_debug, chat_warn};

use crate::protocol::UiChunk;
use crate::transport::ChatTransport;
use crate::EngineEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Client-side conversation: folds stream chunks into message snapshots and
/// a lifecycle status, reporting every change to a sink.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    status: LifecycleStatus,
    /// Index of the assistant message the current turn writes into.
    reply_index: Option<usize>,
    /// Text part index per stream part id, within the reply.
    text_parts: HashMap<String, usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    /// Appends the user message and opens a turn. Returns the conversation to
    /// post.
    pub fn begin_turn(&mut self, text: &str, sink: &dyn EventSink) -> Vec<Message> {
        let id = uuid::Uuid::new_v4().to_string();
        self.messages.push(Message::user_text(id, text));
        self.reply_index = None;
        self.text_parts.clear();
        self.set_status(LifecycleStatus::Submitted, sink);
        sink.emit(EngineEvent::Messages(self.messages.clone()));
        self.messages.clone()
    }

    pub fn apply_chunk(&mut self, chunk: UiChunk, sink: &dyn EventSink) {
        if !self.status.is_loading() {
            chat_debug!("chunk after turn ended: {:?}", chunk);
            return;
        }
        if self.status == LifecycleStatus::Submitted {
            self.set_status(LifecycleStatus::Streaming, sink);
        }
        match chunk {
            UiChunk::Start { message_id } => {
                self.open_reply(message_id);
                sink.emit(EngineEvent::Messages(self.messages.clone()));
            }
            UiChunk::TextStart { id } => {
                self.text_part(&id);
            }
            UiChunk::TextDelta { id, delta } => {
                let (reply, part) = self.text_part(&id);
                if let Some(Part::Text { text }) = self.messages[reply].parts.get_mut(part) {
                    text.push_str(&delta);
                }
                sink.emit(EngineEvent::Messages(self.messages.clone()));
            }
            UiChunk::TextEnd { .. } | UiChunk::Unknown => {}
            UiChunk::Finish => self.set_status(LifecycleStatus::Success, sink),
            UiChunk::Error { error_text } => self.fail(error_text, sink),
        }
    }

    /// End of body. A stream that closes without `finish` still succeeds.
    pub fn finish(&mut self, sink: &dyn EventSink) {
        if self.status.is_loading() {
            self.set_status(LifecycleStatus::Success, sink);
        }
    }

    pub fn fail(&mut self, message: String, sink: &dyn EventSink) {
        if !self.status.is_loading() {
            return;
        }
        chat_warn!("turn failed: {}", message);
        self.status = LifecycleStatus::Error;
        sink.emit(EngineEvent::StreamFailed(message));
    }

    fn set_status(&mut self, next: LifecycleStatus, sink: &dyn EventSink) {
        if self.status == next {
            return;
        }
        self.status = next;
        sink.emit(EngineEvent::Status(next));
    }

    fn open_reply(&mut self, message_id: Option<String>) -> usize {
        if let Some(index) = self.reply_index {
            if message_id.is_none() || self.messages[index].id == message_id {
                return index;
            }
        }
        let id = message_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.messages.push(Message {
            id: Some(id),
            role: Role::Assistant,
            parts: Vec::new(),
        });
        self.text_parts.clear();
        let index = self.messages.len() - 1;
        self.reply_index = Some(index);
        index
    }

    /// Reply and part index for a stream part id, creating either on demand.
    fn text_part(&mut self, id: &str) -> (usize, usize) {
        let reply = match self.reply_index {
            Some(index) => index,
            None => self.open_reply(None),
        };
        if let Some(part) = self.text_parts.get(id) {
            return (reply, *part);
        }
        let parts = &mut self.messages[reply].parts;
        parts.push(Part::Text {
            text: String::new(),
        });
        let part = parts.len() - 1;
        self.text_parts.insert(id.to_string(), part);
        (reply, part)
    }
}

/// Runs turns of one conversation over a transport.
pub struct ChatClient {
    session: Mutex<ChatSession>,
    transport: Arc<dyn ChatTransport>,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            session: Mutex::new(ChatSession::new()),
            transport,
        }
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages().to_vec()
    }

    /// One full turn: user message, streamed reply, terminal status.
    pub async fn send(&self, text: &str, sink: &dyn EventSink) {
        let request = self.lock().begin_turn(text, sink);
        let mut on_chunk = |chunk: UiChunk| self.lock().apply_chunk(chunk, sink);
        let result = self.transport.stream_reply(&request, &mut on_chunk).await;
        let mut session = self.lock();
        match result {
            Ok(()) => session.finish(sink),
            Err(err) => session.fail(err.message, sink),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<EngineEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: EngineEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn reply_without_start_creates_message() {
        let sink = RecordingSink::default();
        let mut session = ChatSession::new();
        session.begin_turn("hi", &sink);
        session.apply_chunk(
            UiChunk::TextDelta {
                id: "0".into(),
                delta: "Hello".into(),
            },
            &sink,
        );
        session.finish(&sink);

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].text(), "Hello");
        assert_eq!(session.status(), LifecycleStatus::Success);
    }

    #[test]
    fn chunks_after_error_are_dropped() {
        let sink = RecordingSink::default();
        let mut session = ChatSession::new();
        session.begin_turn("hi", &sink);
        session.apply_chunk(
            UiChunk::Error {
                error_text: "quota".into(),
            },
            &sink,
        );
        session.apply_chunk(UiChunk::Finish, &sink);
        session.finish(&sink);

        assert_eq!(session.status(), LifecycleStatus::Error);
        let events = sink.0.lock().unwrap();
        assert_eq!(events.last(), Some(&EngineEvent::StreamFailed("quota".into())));
    }
}
