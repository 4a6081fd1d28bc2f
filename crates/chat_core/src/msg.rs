use std::time::Instant;

use crate::bus::AppEvent;
use crate::lifecycle::LifecycleStatus;
use crate::message::Message;
use crate::sidebar::SourceTab;
use crate::source::SourceRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the password field on the login gate.
    PasswordChanged(String),
    /// User submitted the login form.
    LoginSubmitted,
    /// Login endpoint answered.
    LoginFinished {
        success: bool,
        error: Option<String>,
    },
    LogoutClicked,
    /// User edited the composer.
    InputChanged(String),
    /// User pressed send (button or Enter).
    SendClicked,
    /// Chat channel moved to a new lifecycle status.
    StreamStatus(LifecycleStatus),
    /// Chat channel delivered a new snapshot of the whole conversation.
    MessagesUpdated(Vec<Message>),
    /// Chat channel reported a transport or model error for this turn.
    StreamFailed(String),
    /// Citation sources for one message arrived.
    SourcesLoaded {
        message_key: String,
        sources: Vec<SourceRecord>,
    },
    /// User clicked an inline citation marker.
    MarkerClicked { message_key: String, marker: String },
    /// Pointer moved onto an inline citation marker.
    MarkerPointerEntered {
        message_key: String,
        marker: String,
        at: Instant,
    },
    /// Pointer left the marker (or its preview card).
    MarkerPointerLeft { at: Instant },
    /// User clicked the body of a marker's preview card.
    PreviewCardClicked { message_key: String, marker: String },
    /// Event delivered by the cross-component bus.
    Bus(AppEvent),
    SidebarTabSelected(SourceTab),
    SidebarCloseClicked,
    /// User clicked a source entry in the sidebar list.
    SidebarItemClicked(u32),
    /// UI tick; commits debounced hover changes.
    Tick(Instant),
    /// Fallback for placeholder wiring.
    NoOp,
}
