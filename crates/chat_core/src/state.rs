use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chat_logging::{chat_debug, chat_info, chat_warn};

use crate::bus::{AppEvent, PanelParams, SourcesOpenPayload};
use crate::lifecycle::LifecycleStatus;
use crate::marker::{find_source, HoverDebounce, HoverTarget};
use crate::message::{Message, Role};
use crate::panel::PanelState;
use crate::sidebar::{ItemClick, SourceSidebar};
use crate::source::{ProvenanceResolver, SourceRecord};
use crate::time_label::{Clock, TimeLabelCache};
use crate::Effect;

pub const LOADING_PLACEHOLDER_KEY: &str = "loading-ai-message";
pub const ERROR_PLACEHOLDER_KEY: &str = "error-ai-message";
pub const LOGIN_FAILED_TEXT: &str = "登录失败";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    authenticated: bool,
    password: String,
    login_pending: bool,
    login_error: Option<String>,
    input: String,
    messages: Vec<Message>,
    status: LifecycleStatus,
    error: Option<String>,
    time_labels: TimeLabelCache,
    sources: BTreeMap<String, Vec<SourceRecord>>,
    requested_sources: BTreeSet<String>,
    panel: PanelState,
    hover: HoverDebounce,
    resolver: ProvenanceResolver,
    delegate_sidebar_items: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects the clock used for first-time message labels.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.time_labels = TimeLabelCache::new(clock);
        self
    }

    /// Host the client is served from; drives internal/external provenance.
    pub fn with_page_host(mut self, host: &str) -> Self {
        self.resolver = ProvenanceResolver::new(host);
        self
    }

    /// Sidebar item clicks select the record instead of opening its url.
    pub fn with_sidebar_item_delegate(mut self) -> Self {
        self.delegate_sidebar_items = true;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn login_pending(&self) -> bool {
        self.login_pending
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn time_labels(&self) -> &TimeLabelCache {
        &self.time_labels
    }

    pub fn sources_for(&self, message_key: &str) -> &[SourceRecord] {
        self.sources
            .get(message_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn hover(&self) -> &HoverDebounce {
        &self.hover
    }

    pub fn resolver(&self) -> &ProvenanceResolver {
        &self.resolver
    }

    /// Returns whether anything changed since the last call, and clears it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_password(&mut self, password: String) {
        if self.password != password {
            self.password = password;
            self.mark_dirty();
        }
    }

    pub(crate) fn begin_login(&mut self) -> Option<String> {
        if self.authenticated || self.login_pending || self.password.is_empty() {
            return None;
        }
        self.login_pending = true;
        self.login_error = None;
        self.mark_dirty();
        Some(self.password.clone())
    }

    pub(crate) fn finish_login(&mut self, success: bool, error: Option<String>) {
        self.login_pending = false;
        self.authenticated = success;
        self.login_error = if success {
            None
        } else {
            Some(
                error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| LOGIN_FAILED_TEXT.to_string()),
            )
        };
        self.password.clear();
        chat_info!("login finished success={}", success);
        self.mark_dirty();
    }

    pub(crate) fn logout(&mut self) {
        self.authenticated = false;
        self.input.clear();
        self.panel.close();
        self.mark_dirty();
    }

    pub(crate) fn set_input(&mut self, input: String) {
        if self.input != input {
            self.input = input;
            self.mark_dirty();
        }
    }

    /// Trimmed composer text if a send is allowed right now.
    pub(crate) fn take_send_text(&mut self) -> Option<String> {
        if !self.authenticated {
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        if self.status.is_loading() {
            chat_debug!("send rejected: turn still {:?}", self.status);
            return None;
        }
        self.input.clear();
        self.mark_dirty();
        Some(text)
    }

    pub(crate) fn apply_status(&mut self, next: LifecycleStatus) -> Vec<Effect> {
        if next == self.status {
            return Vec::new();
        }
        if !self.status.can_advance_to(next) {
            chat_warn!("ignoring status {:?} after {:?}", next, self.status);
            return Vec::new();
        }
        if next == LifecycleStatus::Submitted {
            self.error = None;
        }
        self.status = next;
        self.stamp_labels();
        self.mark_dirty();

        if next == LifecycleStatus::Success {
            return self.request_sources_for_last().into_iter().collect();
        }
        Vec::new()
    }

    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        if self.messages == messages {
            return;
        }
        self.messages = messages;
        self.stamp_labels();
        self.mark_dirty();
    }

    pub(crate) fn fail_turn(&mut self, message: String) {
        if self.status.can_advance_to(LifecycleStatus::Error) {
            self.status = LifecycleStatus::Error;
        }
        chat_warn!("turn failed: {}", message);
        self.error = Some(message);
        self.stamp_labels();
        self.mark_dirty();
    }

    pub(crate) fn store_sources(&mut self, message_key: String, sources: Vec<SourceRecord>) {
        chat_debug!("{} source(s) for {}", sources.len(), message_key);
        self.sources.insert(message_key, sources);
        self.mark_dirty();
    }

    pub(crate) fn marker_click(&self, message_key: &str, marker: &str) -> Option<AppEvent> {
        crate::marker::marker_click_event(marker, self.sources_for(message_key))
    }

    pub(crate) fn preview_click(&self, message_key: &str, marker: &str) -> Option<String> {
        crate::marker::preview_click_url(marker, self.sources_for(message_key))
    }

    pub(crate) fn hover_enter(&mut self, message_key: String, marker: &str, at: Instant) {
        let Some(source) = find_source(marker, self.sources_for(&message_key)) else {
            return;
        };
        let target = HoverTarget {
            message_key,
            key: source.key,
        };
        self.hover.pointer_entered(target, at);
    }

    pub(crate) fn hover_leave(&mut self, at: Instant) {
        self.hover.pointer_left(at);
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        if self.hover.poll(now) {
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_bus_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SourcesOpen(SourcesOpenPayload {
                sources,
                active_key,
            }) => self.open_sources(sources, active_key),
            AppEvent::PanelOpen(payload) => {
                self.panel.apply(payload.panel, payload.params);
                self.mark_dirty();
            }
            other => {
                chat_debug!("no handler for {}", other.kind().name());
            }
        }
    }

    fn open_sources(&mut self, sources: Vec<SourceRecord>, active_key: Option<u32>) {
        if let Some(sidebar) = self.panel.sidebar_mut() {
            if sidebar.shows_same_sources(&sources) {
                sidebar.select(active_key);
                self.mark_dirty();
                return;
            }
        }
        let message_key = self
            .sources
            .iter()
            .find(|(_, set)| **set == sources)
            .map(|(key, _)| key.clone());
        let mut sidebar = SourceSidebar::open(sources, active_key, &self.resolver);
        if self.delegate_sidebar_items {
            sidebar = sidebar.with_item_delegate();
        }
        self.panel
            .show_sources(sidebar, PanelParams { message_key });
        self.mark_dirty();
    }

    pub(crate) fn set_sidebar_tab(&mut self, tab: crate::sidebar::SourceTab) {
        if let Some(sidebar) = self.panel.sidebar_mut() {
            sidebar.set_tab(tab);
            self.mark_dirty();
        }
    }

    pub(crate) fn sidebar_close_event(&self) -> Option<AppEvent> {
        self.panel.sidebar().map(SourceSidebar::close)
    }

    pub(crate) fn click_sidebar_item(&mut self, key: u32) -> Option<String> {
        let click = self.panel.sidebar()?.click_item(key);
        match click {
            ItemClick::OpenUrl(url) => Some(url),
            ItemClick::Delegated(source) => {
                if let Some(sidebar) = self.panel.sidebar_mut() {
                    sidebar.select(Some(source.key));
                    self.mark_dirty();
                }
                None
            }
            ItemClick::Ignored => None,
        }
    }

    /// Key of the pending assistant placeholder, when one is shown: the last
    /// message is from the user and the turn is in flight or failed.
    pub fn placeholder_key(&self) -> Option<&'static str> {
        let last_is_user = self.messages.last().is_some_and(|m| m.role == Role::User);
        if !last_is_user {
            return None;
        }
        if self.error.is_some() {
            Some(ERROR_PLACEHOLDER_KEY)
        } else if self.status.is_loading() {
            Some(LOADING_PLACEHOLDER_KEY)
        } else {
            None
        }
    }

    fn stamp_labels(&mut self) {
        for (index, message) in self.messages.iter().enumerate() {
            self.time_labels.label_for(&message.key(index));
        }
        if let Some(key) = self.placeholder_key() {
            self.time_labels.label_for(key);
        }
    }

    fn request_sources_for_last(&mut self) -> Option<Effect> {
        let index = self.messages.len().checked_sub(1)?;
        let last = &self.messages[index];
        if last.role != Role::Assistant || last.id.is_none() {
            return None;
        }
        let message_key = last.key(index);
        if !self.requested_sources.insert(message_key.clone()) {
            return None;
        }
        Some(Effect::FetchSources { message_key })
    }
}
