//! Chat core: pure state machine, streaming render pipeline and view model.
mod bus;
mod effect;
mod lifecycle;
mod marker;
mod message;
mod msg;
mod panel;
mod render;
mod sidebar;
mod source;
mod state;
mod streaming;
mod time_label;
mod update;
mod view_model;

pub use bus::{
    AppEvent, EventBus, EventKind, PanelId, PanelOpenPayload, PanelParams, SourcesOpenPayload,
    SubscriptionId,
};
pub use effect::Effect;
pub use lifecycle::LifecycleStatus;
pub use marker::{
    find_source, marker_click_event, parse_marker_key, preview_click_url, resolve_marker,
    scan_markers, HoverDebounce, HoverTarget, MarkerView, PreviewCard, HOVER_CLOSE_DELAY,
    HOVER_OPEN_DELAY,
};
pub use message::{Message, Part, Role};
pub use msg::Msg;
pub use panel::{ActivePanel, PanelState};
pub use render::{
    is_updating, select_body, RenderBody, RenderStatus, ERROR_HEADER, FALLBACK_ERROR_TEXT,
    THINKING_TEXT,
};
pub use sidebar::{ItemClick, SourceSidebar, SourceTab};
pub use source::{Provenance, ProvenanceResolver, SourceRecord, SourceType, UNKNOWN_SOURCE_NAME};
pub use state::{AppState, ERROR_PLACEHOLDER_KEY, LOADING_PLACEHOLDER_KEY, LOGIN_FAILED_TEXT};
pub use streaming::{split_incomplete_tail, Incomplete, IncompleteKind, StreamingTail};
pub use time_label::{format_label, Clock, SystemClock, TimeLabelCache};
pub use update::update;
pub use view_model::{
    AppViewModel, LoginView, MessageRowView, RowBody, SidebarItemView, SidebarView,
};
