//! Typed publish/subscribe channel between deeply nested render pieces and
//! the panel owner.
//!
//! The catalogue is closed: every cross-component signal is an `AppEvent`
//! variant, so the full set of contracts is visible here.

use crate::source::SourceRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesOpenPayload {
    pub sources: Vec<SourceRecord>,
    pub active_key: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Source,
    Canvas,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelParams {
    pub message_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOpenPayload {
    /// `None` closes whatever panel is open.
    pub panel: Option<PanelId>,
    pub params: Option<PanelParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// `sources:open`
    SourcesOpen(SourcesOpenPayload),
    /// `panel:open`
    PanelOpen(PanelOpenPayload),
    /// `history:refresh`
    HistoryRefresh(String),
    /// `history:switch`
    HistorySwitch,
    /// `history:chatList`
    HistoryChatList(String),
    /// `input:retry`
    InputRetry(String),
    /// `source:search`
    SourceSearch(String),
    /// `faq:scroll`
    FaqScroll,
    /// `canvas:stream`
    CanvasStream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SourcesOpen,
    PanelOpen,
    HistoryRefresh,
    HistorySwitch,
    HistoryChatList,
    InputRetry,
    SourceSearch,
    FaqScroll,
    CanvasStream,
}

impl EventKind {
    /// Wire name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::SourcesOpen => "sources:open",
            EventKind::PanelOpen => "panel:open",
            EventKind::HistoryRefresh => "history:refresh",
            EventKind::HistorySwitch => "history:switch",
            EventKind::HistoryChatList => "history:chatList",
            EventKind::InputRetry => "input:retry",
            EventKind::SourceSearch => "source:search",
            EventKind::FaqScroll => "faq:scroll",
            EventKind::CanvasStream => "canvas:stream",
        }
    }
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::SourcesOpen(_) => EventKind::SourcesOpen,
            AppEvent::PanelOpen(_) => EventKind::PanelOpen,
            AppEvent::HistoryRefresh(_) => EventKind::HistoryRefresh,
            AppEvent::HistorySwitch => EventKind::HistorySwitch,
            AppEvent::HistoryChatList(_) => EventKind::HistoryChatList,
            AppEvent::InputRetry(_) => EventKind::InputRetry,
            AppEvent::SourceSearch(_) => EventKind::SourceSearch,
            AppEvent::FaqScroll => EventKind::FaqScroll,
            AppEvent::CanvasStream(_) => EventKind::CanvasStream,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&AppEvent) + Send>;

/// Synchronous, single-threaded mediator.
///
/// `emit` runs every handler registered for the event's kind, in registration
/// order, before returning. Nothing is buffered: a handler registered after an
/// emit never sees it.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, EventKind, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&AppEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, kind, Box::new(handler)));
        id
    }

    /// Returns false when the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Number of handlers that received the event.
    pub fn emit(&mut self, event: &AppEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (_, sub_kind, handler) in self.subscribers.iter_mut() {
            if *sub_kind == kind {
                handler(event);
                delivered += 1;
            }
        }
        chat_logging::chat_debug!("bus emit {} -> {} handler(s)", kind.name(), delivered);
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, sub_kind, _)| *sub_kind == kind)
            .count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
