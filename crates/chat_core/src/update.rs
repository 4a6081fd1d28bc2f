use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::PasswordChanged(password) => {
            state.set_password(password);
            Vec::new()
        }
        Msg::LoginSubmitted => match state.begin_login() {
            Some(password) => vec![Effect::CheckLogin { password }],
            None => Vec::new(),
        },
        Msg::LoginFinished { success, error } => {
            state.finish_login(success, error);
            Vec::new()
        }
        Msg::LogoutClicked => {
            state.logout();
            Vec::new()
        }
        Msg::InputChanged(input) => {
            state.set_input(input);
            Vec::new()
        }
        Msg::SendClicked => match state.take_send_text() {
            Some(text) => vec![Effect::SendMessage { text }],
            None => Vec::new(),
        },
        Msg::StreamStatus(status) => state.apply_status(status),
        Msg::MessagesUpdated(messages) => {
            state.replace_messages(messages);
            Vec::new()
        }
        Msg::StreamFailed(message) => {
            state.fail_turn(message);
            Vec::new()
        }
        Msg::SourcesLoaded {
            message_key,
            sources,
        } => {
            state.store_sources(message_key, sources);
            Vec::new()
        }
        Msg::MarkerClicked {
            message_key,
            marker,
        } => state
            .marker_click(&message_key, &marker)
            .map(Effect::Emit)
            .into_iter()
            .collect(),
        Msg::MarkerPointerEntered {
            message_key,
            marker,
            at,
        } => {
            state.hover_enter(message_key, &marker, at);
            Vec::new()
        }
        Msg::MarkerPointerLeft { at } => {
            state.hover_leave(at);
            Vec::new()
        }
        Msg::PreviewCardClicked {
            message_key,
            marker,
        } => state
            .preview_click(&message_key, &marker)
            .map(Effect::OpenUrl)
            .into_iter()
            .collect(),
        Msg::Bus(event) => {
            state.apply_bus_event(event);
            Vec::new()
        }
        Msg::SidebarTabSelected(tab) => {
            state.set_sidebar_tab(tab);
            Vec::new()
        }
        Msg::SidebarCloseClicked => state
            .sidebar_close_event()
            .map(Effect::Emit)
            .into_iter()
            .collect(),
        Msg::SidebarItemClicked(key) => state
            .click_sidebar_item(key)
            .map(Effect::OpenUrl)
            .into_iter()
            .collect(),
        Msg::Tick(now) => {
            state.tick(now);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
