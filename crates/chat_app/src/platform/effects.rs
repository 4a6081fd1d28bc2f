use chat_core::{Effect, Msg};
use chat_engine::{EngineEvent, EngineHandle};
use chat_logging::{chat_info, chat_warn};

/// Hands engine-bound effects to the engine thread and turns its events back
/// into messages for the update loop.
pub struct EffectRunner {
    engine: EngineHandle,
    turn: u64,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine, turn: 0 }
    }

    /// Runs engine-bound effects. `Emit` and `OpenUrl` are front-end
    /// concerns and are returned to the caller.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut local = Vec::new();
        for effect in effects {
            match effect {
                Effect::SendMessage { text } => {
                    self.turn += 1;
                    chat_logging::set_turn(self.turn);
                    chat_info!("SendMessage text_len={}", text.len());
                    self.engine.send_message(text);
                }
                Effect::CheckLogin { password } => {
                    chat_info!("CheckLogin");
                    self.engine.check_login(password);
                }
                Effect::FetchSources { message_key } => {
                    chat_info!("FetchSources message_key={}", message_key);
                    self.engine.fetch_sources(message_key);
                }
                other @ (Effect::Emit(_) | Effect::OpenUrl(_)) => local.push(other),
            }
        }
        local
    }

    /// Drains every event the engine has produced so far.
    pub fn poll_events(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            msgs.push(map_event(event));
        }
        msgs
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::LoginFinished { success, error } => Msg::LoginFinished { success, error },
        EngineEvent::Status(status) => Msg::StreamStatus(status),
        EngineEvent::Messages(messages) => Msg::MessagesUpdated(messages),
        EngineEvent::StreamFailed(message) => {
            chat_warn!("stream failed: {}", message);
            Msg::StreamFailed(message)
        }
        EngineEvent::SourcesLoaded {
            message_key,
            sources,
        } => Msg::SourcesLoaded {
            message_key,
            sources,
        },
    }
}
