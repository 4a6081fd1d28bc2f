use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chat_logging::{chat_error, chat_warn};

use crate::login::LoginClient;
use crate::session::{ChannelEventSink, ChatClient, EventSink};
use crate::sources::SourceProvider;
use crate::transport::{HttpChatTransport, TransportSettings};
use crate::{ChatError, EngineEvent};

/// Shown on the login gate when the login request itself failed.
pub const LOGIN_RETRY_TEXT: &str = "登录失败，请重试";

enum EngineCommand {
    SendMessage { text: String },
    CheckLogin { password: String },
    FetchSources { message_key: String },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub server_url: String,
    pub transport: TransportSettings,
    pub login_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            transport: TransportSettings::default(),
            login_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone)]
struct Workers {
    chat: Arc<ChatClient>,
    login: Arc<LoginClient>,
    sources: Arc<dyn SourceProvider>,
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    /// Builds the HTTP clients for `settings.server_url` and starts the worker
    /// thread.
    pub fn connect(
        settings: EngineSettings,
        sources: Arc<dyn SourceProvider>,
    ) -> Result<Self, ChatError> {
        let transport = HttpChatTransport::new(&settings.server_url, settings.transport.clone())?;
        let login = LoginClient::new(&settings.server_url, settings.login_timeout)?;
        Ok(Self::new(
            Arc::new(ChatClient::new(Arc::new(transport))),
            Arc::new(login),
            sources,
        ))
    }

    pub fn new(
        chat: Arc<ChatClient>,
        login: Arc<LoginClient>,
        sources: Arc<dyn SourceProvider>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let workers = Workers {
            chat,
            login,
            sources,
        };

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    chat_error!("engine runtime failed to start: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let workers = workers.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(&workers, command, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn send_message(&self, text: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::SendMessage { text: text.into() });
    }

    pub fn check_login(&self, password: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::CheckLogin {
            password: password.into(),
        });
    }

    pub fn fetch_sources(&self, message_key: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::FetchSources {
            message_key: message_key.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    workers: &Workers,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::SendMessage { text } => {
            let sink = ChannelEventSink::new(event_tx);
            workers.chat.send(&text, &sink).await;
        }
        EngineCommand::CheckLogin { password } => {
            let event = match workers.login.login(&password).await {
                Ok(outcome) => EngineEvent::LoginFinished {
                    success: outcome.success,
                    error: outcome.error,
                },
                Err(err) => {
                    chat_warn!("login request failed: {}", err);
                    EngineEvent::LoginFinished {
                        success: false,
                        error: Some(LOGIN_RETRY_TEXT.to_string()),
                    }
                }
            };
            ChannelEventSink::new(event_tx).emit(event);
        }
        EngineCommand::FetchSources { message_key } => {
            match workers.sources.sources_for(&message_key).await {
                Ok(sources) => ChannelEventSink::new(event_tx).emit(EngineEvent::SourcesLoaded {
                    message_key,
                    sources,
                }),
                Err(err) => chat_warn!("sources for {} unavailable: {}", message_key, err),
            }
        }
    }
}
