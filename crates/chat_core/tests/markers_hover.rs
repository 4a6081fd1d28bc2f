use std::time::{Duration, Instant};

use chat_core::{
    marker_click_event, preview_click_url, resolve_marker, AppEvent, HoverDebounce, HoverTarget,
    MarkerView, Provenance, ProvenanceResolver, SourceRecord, SourcesOpenPayload,
};
use pretty_assertions::assert_eq;

fn sources() -> Vec<SourceRecord> {
    vec![
        SourceRecord::new(3, "Internal wiki").with_content("Snippet"),
        SourceRecord::new(7, "IBM").with_url("https://ibm.com/x"),
    ]
}

fn target(key: u32) -> HoverTarget {
    HoverTarget {
        message_key: "a1".to_string(),
        key,
    }
}

#[test]
fn marker_matches_by_key_not_position() {
    let resolver = ProvenanceResolver::new("app.example.com");
    let view = resolve_marker("7", &sources(), &resolver, None);
    match view {
        MarkerView::Linked {
            key,
            provenance,
            selected,
            preview,
        } => {
            assert_eq!(key, 7);
            assert_eq!(provenance, Provenance::External);
            assert!(!selected);
            assert_eq!(preview.title, "IBM");
            assert_eq!(preview.site_name, "未知来源");
            assert_eq!(preview.url.as_deref(), Some("https://ibm.com/x"));
        }
        other => panic!("expected linked marker, got {other:?}"),
    }
}

#[test]
fn unknown_or_malformed_marker_is_plain() {
    let resolver = ProvenanceResolver::default();
    assert_eq!(
        resolve_marker("1", &sources(), &resolver, None),
        MarkerView::Plain {
            label: "1".to_string()
        }
    );
    assert_eq!(
        resolve_marker("abc", &sources(), &resolver, None),
        MarkerView::Plain {
            label: "abc".to_string()
        }
    );
    assert_eq!(
        resolve_marker("12abc", &sources(), &resolver, None),
        MarkerView::Plain {
            label: "12".to_string()
        }
    );
    assert_eq!(
        resolve_marker("1", &[], &resolver, None).label(),
        "1".to_string()
    );
}

#[test]
fn hovered_key_marks_marker_selected() {
    let resolver = ProvenanceResolver::default();
    let view = resolve_marker("3", &sources(), &resolver, Some(3));
    assert!(matches!(view, MarkerView::Linked { selected: true, .. }));
}

#[test]
fn click_opens_full_set_with_active_key() {
    assert_eq!(
        marker_click_event("3", &sources()),
        Some(AppEvent::SourcesOpen(SourcesOpenPayload {
            sources: sources(),
            active_key: Some(3),
        }))
    );
    assert_eq!(marker_click_event("9", &sources()), None);
}

#[test]
fn preview_click_needs_url() {
    assert_eq!(
        preview_click_url("7", &sources()),
        Some("https://ibm.com/x".to_string())
    );
    assert_eq!(preview_click_url("3", &sources()), None);
}

#[test]
fn hover_opens_only_after_delay() {
    let start = Instant::now();
    let mut hover = HoverDebounce::default();

    hover.pointer_entered(target(3), start);
    assert!(!hover.poll(start + Duration::from_millis(50)));
    assert_eq!(hover.hovered(), None);

    assert!(hover.poll(start + Duration::from_millis(100)));
    assert_eq!(hover.hovered(), Some(&target(3)));
    assert_eq!(hover.hovered_key_in("a1"), Some(3));
    assert_eq!(hover.hovered_key_in("a2"), None);
}

#[test]
fn quick_pass_never_opens() {
    let start = Instant::now();
    let mut hover = HoverDebounce::default();

    hover.pointer_entered(target(3), start);
    hover.pointer_left(start + Duration::from_millis(40));
    assert!(!hover.poll(start + Duration::from_millis(500)));
    assert_eq!(hover.hovered(), None);
}

#[test]
fn reentering_cancels_pending_close() {
    let start = Instant::now();
    let mut hover = HoverDebounce::default();
    hover.pointer_entered(target(3), start);
    hover.poll(start + Duration::from_millis(100));

    let left = start + Duration::from_millis(200);
    hover.pointer_left(left);
    assert_eq!(hover.next_deadline(), Some(left + Duration::from_millis(100)));
    hover.pointer_entered(target(3), left + Duration::from_millis(30));
    assert_eq!(hover.next_deadline(), None);

    assert!(!hover.poll(left + Duration::from_millis(500)));
    assert_eq!(hover.hovered(), Some(&target(3)));
}

#[test]
fn moving_to_adjacent_marker_switches_after_delay() {
    let start = Instant::now();
    let mut hover = HoverDebounce::default();
    hover.pointer_entered(target(3), start);
    hover.poll(start + Duration::from_millis(100));

    let moved = start + Duration::from_millis(300);
    hover.pointer_left(moved);
    hover.pointer_entered(target(7), moved);
    assert!(hover.poll(moved + Duration::from_millis(100)));
    assert_eq!(hover.hovered(), Some(&target(7)));
}

#[test]
fn leaving_closes_after_delay() {
    let start = Instant::now();
    let mut hover = HoverDebounce::default();
    hover.pointer_entered(target(3), start);
    hover.poll(start + Duration::from_millis(100));

    hover.pointer_left(start + Duration::from_millis(200));
    assert!(!hover.poll(start + Duration::from_millis(250)));
    assert!(hover.poll(start + Duration::from_millis(300)));
    assert_eq!(hover.hovered(), None);
}
