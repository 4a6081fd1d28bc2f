use crate::bus::AppEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the login endpoint whether the password is right.
    CheckLogin { password: String },
    /// Append a user message and start a new turn on the chat channel.
    SendMessage { text: String },
    /// Load the citation sources of a finished assistant message.
    FetchSources { message_key: String },
    /// Publish on the cross-component bus.
    Emit(AppEvent),
    /// Open a url in a new browsing context.
    OpenUrl(String),
}
