//! Chat engine: stream wire format, HTTP clients and effect execution.
mod engine;
mod login;
mod protocol;
mod session;
mod sources;
mod transport;
mod types;
mod upstream;

pub use engine::{EngineHandle, EngineSettings, LOGIN_RETRY_TEXT};
pub use login::{LoginClient, LoginOutcome};
pub use protocol::{
    ui_chunk_stream, ChatRequest, ErrorBody, LoginRequest, LoginResponse, UiChunk, DONE_SENTINEL,
};
pub use session::{ChannelEventSink, ChatClient, ChatSession, EventSink};
pub use sources::{SourceProvider, StaticSourceProvider};
pub use transport::{ChatTransport, HttpChatTransport, TransportSettings};
pub use types::{ChatError, EngineEvent, FailureKind};
pub use upstream::{
    usable_proxy, CompletionBackend, CompletionStream, OpenAiBackend, UpstreamSettings,
    DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, SYSTEM_PROMPT,
};
