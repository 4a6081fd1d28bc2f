use crate::lifecycle::LifecycleStatus;
use crate::marker::{resolve_marker, scan_markers, MarkerView};
use crate::message::Role;
use crate::panel::ActivePanel;
use crate::render::{is_updating, select_body, RenderBody, FALLBACK_ERROR_TEXT};
use crate::sidebar::{SourceSidebar, SourceTab};
use crate::source::{Provenance, SourceRecord};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginView {
    pub error: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBody {
    User { text: String },
    Assistant(RenderBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRowView {
    pub key: String,
    pub role: Role,
    pub time_label: Option<String>,
    pub body: RowBody,
    /// Markers found in the text, in order: raw child text and its resolution.
    pub markers: Vec<(String, MarkerView)>,
    /// True for the pending assistant bubble shown before the reply arrives.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItemView {
    pub key: u32,
    pub title: String,
    pub site_name: String,
    pub url: Option<String>,
    pub provenance: Provenance,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarView {
    pub message_key: Option<String>,
    pub active_tab: SourceTab,
    pub active_key: Option<u32>,
    pub external_count: usize,
    pub internal_count: usize,
    pub items: Vec<SidebarItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub authenticated: bool,
    pub login: LoginView,
    pub input: String,
    pub status: LifecycleStatus,
    pub loading: bool,
    pub can_send: bool,
    /// No messages yet: the front-end shows its welcome text.
    pub empty: bool,
    pub rows: Vec<MessageRowView>,
    pub sidebar: Option<SidebarView>,
    pub canvas_open: bool,
    pub dirty: bool,
}

impl AppState {
    pub fn view(&self) -> AppViewModel {
        let status = self.status();
        let loading = status.is_loading();
        AppViewModel {
            authenticated: self.is_authenticated(),
            login: LoginView {
                error: self.login_error().map(ToOwned::to_owned),
                pending: self.login_pending(),
            },
            input: self.input().to_string(),
            status,
            loading,
            can_send: self.is_authenticated() && !loading && !self.input().trim().is_empty(),
            empty: self.messages().is_empty(),
            rows: self.message_rows(),
            sidebar: self.panel().sidebar().map(|sidebar| self.sidebar_view(sidebar)),
            canvas_open: matches!(self.panel().active(), ActivePanel::Canvas),
            dirty: self.is_dirty(),
        }
    }

    fn message_rows(&self) -> Vec<MessageRowView> {
        let messages = self.messages();
        let status = self.status();
        let error = self.error().map(|e| {
            if e.is_empty() {
                FALLBACK_ERROR_TEXT
            } else {
                e
            }
        });

        let mut rows: Vec<MessageRowView> = messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let key = message.key(index);
                let text = message.text();
                let is_last = index + 1 == messages.len();
                let body = match message.role {
                    Role::User => RowBody::User { text: text.clone() },
                    Role::Assistant => {
                        let row_error = error.filter(|_| is_last);
                        RowBody::Assistant(select_body(
                            &text,
                            is_updating(status, is_last, message.role),
                            row_error,
                        ))
                    }
                };
                let markers = match message.role {
                    Role::Assistant => self.resolve_markers(&key, &text),
                    Role::User => Vec::new(),
                };
                MessageRowView {
                    time_label: self.time_labels().get(&key).map(ToOwned::to_owned),
                    key,
                    role: message.role,
                    body,
                    markers,
                    placeholder: false,
                }
            })
            .collect();

        if let Some(key) = self.placeholder_key() {
            rows.push(MessageRowView {
                key: key.to_string(),
                role: Role::Assistant,
                time_label: self.time_labels().get(key).map(ToOwned::to_owned),
                body: RowBody::Assistant(select_body("", false, error)),
                markers: Vec::new(),
                placeholder: true,
            });
        }
        rows
    }

    fn resolve_markers(&self, message_key: &str, text: &str) -> Vec<(String, MarkerView)> {
        let sources: &[SourceRecord] = self.sources_for(message_key);
        let hovered = self.hover().hovered_key_in(message_key);
        scan_markers(text)
            .into_iter()
            .map(|marker| {
                (
                    marker.to_string(),
                    resolve_marker(marker, sources, self.resolver(), hovered),
                )
            })
            .collect()
    }

    fn sidebar_view(&self, sidebar: &SourceSidebar) -> SidebarView {
        let resolver = self.resolver();
        SidebarView {
            message_key: self.panel().params().message_key.clone(),
            active_tab: sidebar.active_tab(),
            active_key: sidebar.active_key(),
            external_count: sidebar.count(SourceTab::External),
            internal_count: sidebar.count(SourceTab::Internal),
            items: sidebar
                .visible_sources()
                .into_iter()
                .map(|source| SidebarItemView {
                    key: source.key,
                    title: source.title.clone(),
                    site_name: source.display_name().to_string(),
                    url: source.link().map(ToOwned::to_owned),
                    provenance: resolver.resolve(source),
                    active: sidebar.active_key() == Some(source.key),
                })
                .collect(),
        }
    }
}
