//! Console line input: slash commands and plain composer text.

use std::time::Instant;

use chat_core::{AppViewModel, Msg, Role, SourceTab};

pub const HELP_TEXT: &str = "\
/cite N        open the sources panel on citation N of the latest reply
/peek N        hover citation N (shows its preview card)
/unpeek        stop hovering
/open N        open the page behind citation N
/tab external|internal
/item N        click source N in the sources panel
/close         close the sources panel
/logout
/quit
anything else is sent as a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(Vec<Msg>),
    Help,
    Quit,
    /// Input that could not be understood, with a hint for the user.
    Invalid(String),
}

pub fn parse_line(line: &str, view: &AppViewModel, now: Instant) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    if !view.authenticated {
        if line.trim() == "/quit" {
            return Command::Quit;
        }
        return Command::Dispatch(vec![
            Msg::PasswordChanged(line.trim().to_string()),
            Msg::LoginSubmitted,
        ]);
    }

    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Command::Dispatch(vec![Msg::InputChanged(line.to_string()), Msg::SendClicked]);
    };
    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();

    match name {
        "help" => Command::Help,
        "quit" => Command::Quit,
        "logout" => Command::Dispatch(vec![Msg::LogoutClicked]),
        "close" => Command::Dispatch(vec![Msg::SidebarCloseClicked]),
        "unpeek" => Command::Dispatch(vec![Msg::MarkerPointerLeft { at: now }]),
        "tab" => match arg {
            Some("external") => Command::Dispatch(vec![Msg::SidebarTabSelected(
                SourceTab::External,
            )]),
            Some("internal") => Command::Dispatch(vec![Msg::SidebarTabSelected(
                SourceTab::Internal,
            )]),
            _ => Command::Invalid("usage: /tab external|internal".to_string()),
        },
        "item" => match arg.and_then(|raw| raw.parse::<u32>().ok()) {
            Some(key) => Command::Dispatch(vec![Msg::SidebarItemClicked(key)]),
            None => Command::Invalid("usage: /item N".to_string()),
        },
        "cite" | "peek" | "open" => {
            let Some(marker) = arg else {
                return Command::Invalid(format!("usage: /{name} N"));
            };
            let Some(message_key) = marker_message(view, marker) else {
                return Command::Invalid(format!("no citation {marker} in the latest reply"));
            };
            let marker = marker.to_string();
            let msg = match name {
                "cite" => Msg::MarkerClicked {
                    message_key,
                    marker,
                },
                "peek" => Msg::MarkerPointerEntered {
                    message_key,
                    marker,
                    at: now,
                },
                _ => Msg::PreviewCardClicked {
                    message_key,
                    marker,
                },
            };
            Command::Dispatch(vec![msg])
        }
        _ => Command::Invalid(format!("unknown command /{name}, try /help")),
    }
}

/// Key of the latest assistant row that shows the given marker.
fn marker_message(view: &AppViewModel, marker: &str) -> Option<String> {
    view.rows
        .iter()
        .rev()
        .filter(|row| row.role == Role::Assistant && !row.placeholder)
        .find(|row| row.markers.iter().any(|(raw, _)| raw.trim() == marker))
        .map(|row| row.key.clone())
}
