use std::sync::{Arc, Mutex, Once};

use chat_core::{
    update, AppEvent, AppState, EventBus, EventKind, ItemClick, Msg, PanelId, PanelOpenPayload,
    PanelParams, ProvenanceResolver, SourceRecord, SourceSidebar, SourceTab, SourceType,
    SourcesOpenPayload,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(chat_logging::initialize_for_tests);
}

fn resolver() -> ProvenanceResolver {
    ProvenanceResolver::new("app.example.com")
}

fn mixed_sources() -> Vec<SourceRecord> {
    vec![
        SourceRecord::new(1, "Wiki"),
        SourceRecord::new(2, "IBM").with_url("https://ibm.com/x"),
        SourceRecord::new(3, "Intranet").with_url("https://app.example.com/kb"),
    ]
}

fn sources_open(sources: Vec<SourceRecord>, active_key: u32) -> AppEvent {
    AppEvent::SourcesOpen(SourcesOpenPayload {
        sources,
        active_key: Some(active_key),
    })
}

#[test]
fn initial_tab_is_external_iff_any_external() {
    let sidebar = SourceSidebar::open(mixed_sources(), Some(1), &resolver());
    assert_eq!(sidebar.active_tab(), SourceTab::External);

    let internal_only = vec![
        SourceRecord::new(1, "Wiki"),
        SourceRecord::new(2, "Tagged")
            .with_url("https://ibm.com")
            .with_type(SourceType::Internal),
    ];
    let sidebar = SourceSidebar::open(internal_only, None, &resolver());
    assert_eq!(sidebar.active_tab(), SourceTab::Internal);
}

#[test]
fn tabs_filter_in_original_order() {
    let mut sidebar = SourceSidebar::open(mixed_sources(), None, &resolver());
    let keys = |s: &SourceSidebar| s.visible_sources().iter().map(|r| r.key).collect::<Vec<_>>();
    assert_eq!(keys(&sidebar), vec![2]);

    sidebar.set_tab(SourceTab::Internal);
    assert_eq!(keys(&sidebar), vec![1, 3]);
    assert_eq!(sidebar.count(SourceTab::External), 1);
    assert_eq!(sidebar.count(SourceTab::Internal), 2);
}

#[test]
fn item_click_opens_url_or_delegates() {
    let sidebar = SourceSidebar::open(mixed_sources(), None, &resolver());
    assert_eq!(
        sidebar.click_item(2),
        ItemClick::OpenUrl("https://ibm.com/x".to_string())
    );
    assert_eq!(sidebar.click_item(1), ItemClick::Ignored);
    assert_eq!(sidebar.click_item(42), ItemClick::Ignored);

    let delegated = SourceSidebar::open(mixed_sources(), None, &resolver()).with_item_delegate();
    assert_eq!(
        delegated.click_item(1),
        ItemClick::Delegated(SourceRecord::new(1, "Wiki"))
    );
}

#[test]
fn close_requests_no_panel() {
    let sidebar = SourceSidebar::open(mixed_sources(), None, &resolver());
    assert_eq!(
        sidebar.close(),
        AppEvent::PanelOpen(PanelOpenPayload {
            panel: None,
            params: None
        })
    );
}

#[test]
fn bus_runs_handlers_in_registration_order() {
    init_logging();
    let mut bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&seen);
    let id = bus.subscribe(EventKind::SourcesOpen, move |_| {
        first.lock().unwrap().push("first")
    });
    let second = Arc::clone(&seen);
    bus.subscribe(EventKind::SourcesOpen, move |_| {
        second.lock().unwrap().push("second")
    });
    let panel = Arc::clone(&seen);
    bus.subscribe(EventKind::PanelOpen, move |_| {
        panel.lock().unwrap().push("panel")
    });

    assert_eq!(bus.emit(&sources_open(mixed_sources(), 1)), 2);
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);

    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    assert_eq!(bus.subscriber_count(EventKind::SourcesOpen), 1);
    assert_eq!(bus.emit(&AppEvent::FaqScroll), 0);
}

#[test]
fn late_subscriber_misses_earlier_emits() {
    init_logging();
    let mut bus = EventBus::new();
    assert_eq!(bus.emit(&sources_open(mixed_sources(), 1)), 0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sources = Arc::clone(&seen);
    bus.subscribe(EventKind::SourcesOpen, move |event| {
        sources.lock().unwrap().push(event.clone())
    });
    let panel = Arc::clone(&seen);
    bus.subscribe(EventKind::PanelOpen, move |event| {
        panel.lock().unwrap().push(event.clone())
    });

    let close = AppEvent::PanelOpen(PanelOpenPayload {
        panel: None,
        params: None,
    });
    assert_eq!(bus.emit(&close), 1);
    assert_eq!(*seen.lock().unwrap(), vec![close]);
}

#[test]
fn event_names_follow_catalogue() {
    assert_eq!(EventKind::SourcesOpen.name(), "sources:open");
    assert_eq!(EventKind::PanelOpen.name(), "panel:open");
    assert_eq!(AppEvent::CanvasStream(String::new()).kind().name(), "canvas:stream");
}

#[test]
fn two_emits_before_the_loop_runs_leave_the_second_key() {
    init_logging();
    let mut bus = EventBus::new();
    let queue = Arc::new(Mutex::new(Vec::new()));
    let forward = Arc::clone(&queue);
    bus.subscribe(EventKind::SourcesOpen, move |event| {
        forward.lock().unwrap().push(Msg::Bus(event.clone()))
    });

    bus.emit(&sources_open(mixed_sources(), 1));
    bus.emit(&sources_open(mixed_sources(), 3));

    let mut state = AppState::new().with_page_host("app.example.com");
    for msg in queue.lock().unwrap().drain(..) {
        state = update(state, msg).0;
    }

    let view = state.view();
    let sidebar = view.sidebar.expect("sidebar open");
    assert_eq!(sidebar.active_key, Some(3));
    assert_eq!(sidebar.active_tab, SourceTab::External);
}

#[test]
fn same_set_keeps_tab_new_set_reinitializes() {
    init_logging();
    let state = AppState::new().with_page_host("app.example.com");
    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 1)));
    let (state, _) = update(state, Msg::SidebarTabSelected(SourceTab::Internal));
    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 3)));

    let sidebar = state.view().sidebar.unwrap();
    assert_eq!(sidebar.active_tab, SourceTab::Internal);
    assert_eq!(sidebar.active_key, Some(3));
    assert_eq!(
        sidebar.items.iter().map(|i| i.key).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert!(sidebar.items.iter().any(|i| i.key == 3 && i.active));

    let other = vec![SourceRecord::new(9, "Remote").with_url("https://rust-lang.org")];
    let (state, _) = update(state, Msg::Bus(sources_open(other, 9)));
    let sidebar = state.view().sidebar.unwrap();
    assert_eq!(sidebar.active_tab, SourceTab::External);
    assert_eq!(sidebar.external_count, 1);
    assert_eq!(sidebar.internal_count, 0);
}

#[test]
fn panel_open_none_closes_and_canvas_replaces_sidebar() {
    init_logging();
    let state = AppState::new();
    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 1)));
    assert!(state.panel().is_open());

    let (state, effects) = update(state, Msg::SidebarCloseClicked);
    assert_eq!(
        effects,
        vec![chat_core::Effect::Emit(AppEvent::PanelOpen(PanelOpenPayload {
            panel: None,
            params: None,
        }))]
    );
    let close = match &effects[0] {
        chat_core::Effect::Emit(event) => event.clone(),
        other => panic!("unexpected {other:?}"),
    };
    let (state, _) = update(state, Msg::Bus(close));
    assert!(!state.panel().is_open());
    assert!(state.view().sidebar.is_none());

    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 1)));
    let (state, _) = update(
        state,
        Msg::Bus(AppEvent::PanelOpen(PanelOpenPayload {
            panel: Some(PanelId::Canvas),
            params: Some(PanelParams::default()),
        })),
    );
    let view = state.view();
    assert!(view.canvas_open);
    assert!(view.sidebar.is_none());
}

#[test]
fn delegated_item_click_selects_instead_of_opening() {
    init_logging();
    let state = AppState::new()
        .with_page_host("app.example.com")
        .with_sidebar_item_delegate();
    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 1)));
    let (state, effects) = update(state, Msg::SidebarItemClicked(2));

    assert!(effects.is_empty());
    assert_eq!(state.view().sidebar.unwrap().active_key, Some(2));
}

#[test]
fn item_click_without_delegate_opens_url() {
    init_logging();
    let state = AppState::new().with_page_host("app.example.com");
    let (state, _) = update(state, Msg::Bus(sources_open(mixed_sources(), 1)));
    let (_, effects) = update(state, Msg::SidebarItemClicked(2));
    assert_eq!(
        effects,
        vec![chat_core::Effect::OpenUrl("https://ibm.com/x".to_string())]
    );
}
