//! Inline citation markers (`<sup>N</sup>`) and their hover preview.
//!
//! A marker's child text is parsed into a source key and matched against the
//! message's source set by `key`. Unresolvable markers degrade to a plain
//! glyph; they are never an error.

use std::time::{Duration, Instant};

use crate::bus::{AppEvent, SourcesOpenPayload};
use crate::source::{Provenance, ProvenanceResolver, SourceRecord};

const MARKER_OPEN: &str = "<sup>";
const MARKER_CLOSE: &str = "</sup>";

pub const HOVER_OPEN_DELAY: Duration = Duration::from_millis(100);
pub const HOVER_CLOSE_DELAY: Duration = Duration::from_millis(100);

/// Child texts of every complete `<sup>..</sup>` marker, in order.
pub fn scan_markers(text: &str) -> Vec<&str> {
    let mut markers = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARKER_OPEN) {
        let after_open = &rest[start + MARKER_OPEN.len()..];
        let Some(end) = after_open.find(MARKER_CLOSE) else {
            break;
        };
        markers.push(&after_open[..end]);
        rest = &after_open[end + MARKER_CLOSE.len()..];
    }
    markers
}

/// Leading decimal digits of the marker text; `None` when there are none.
pub fn parse_marker_key(text: &str) -> Option<u32> {
    let trimmed = text.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    trimmed[..digits_end].parse().ok()
}

/// Finds the record a marker points at. Matching is by `key`, never by
/// position in the list.
pub fn find_source<'a>(marker_text: &str, sources: &'a [SourceRecord]) -> Option<&'a SourceRecord> {
    let key = parse_marker_key(marker_text)?;
    sources.iter().find(|source| source.key == key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewCard {
    pub title: String,
    pub snippet: Option<String>,
    pub site_name: String,
    pub url: Option<String>,
}

impl PreviewCard {
    fn from_source(source: &SourceRecord) -> Self {
        Self {
            title: source.title.clone(),
            snippet: (!source.content.is_empty()).then(|| source.content.clone()),
            site_name: source.display_name().to_string(),
            url: source.link().map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerView {
    /// No matching source: a neutral glyph showing the raw marker text.
    Plain { label: String },
    Linked {
        key: u32,
        provenance: Provenance,
        /// True while the debounced hover sits on this marker.
        selected: bool,
        preview: PreviewCard,
    },
}

impl MarkerView {
    pub fn label(&self) -> String {
        match self {
            MarkerView::Plain { label } => label.clone(),
            MarkerView::Linked { key, .. } => key.to_string(),
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, MarkerView::Linked { .. })
    }
}

pub fn resolve_marker(
    marker_text: &str,
    sources: &[SourceRecord],
    resolver: &ProvenanceResolver,
    hovered_key: Option<u32>,
) -> MarkerView {
    match find_source(marker_text, sources) {
        None => MarkerView::Plain {
            label: parse_marker_key(marker_text)
                .map(|key| key.to_string())
                .unwrap_or_else(|| marker_text.trim().to_string()),
        },
        Some(source) => MarkerView::Linked {
            key: source.key,
            provenance: resolver.resolve(source),
            selected: hovered_key == Some(source.key),
            preview: PreviewCard::from_source(source),
        },
    }
}

/// Event to emit when the marker itself is clicked: open the sidebar on the
/// whole source set with the clicked record pre-selected.
pub fn marker_click_event(marker_text: &str, sources: &[SourceRecord]) -> Option<AppEvent> {
    let source = find_source(marker_text, sources)?;
    Some(AppEvent::SourcesOpen(SourcesOpenPayload {
        sources: sources.to_vec(),
        active_key: Some(source.key),
    }))
}

/// Url to open when the preview card body is clicked.
pub fn preview_click_url(marker_text: &str, sources: &[SourceRecord]) -> Option<String> {
    find_source(marker_text, sources)
        .and_then(SourceRecord::link)
        .map(ToOwned::to_owned)
}

/// Identity of a marker on screen: the message it sits in and its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoverTarget {
    pub message_key: String,
    pub key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingChange {
    Open(HoverTarget),
    Close,
}

/// Debounced hover state for marker previews.
///
/// Enter and leave only schedule a change; `poll` commits it once its delay
/// has elapsed. Quick passes across adjacent markers therefore never flash a
/// preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverDebounce {
    open_delay: Duration,
    close_delay: Duration,
    committed: Option<HoverTarget>,
    pending: Option<(PendingChange, Instant)>,
}

impl Default for HoverDebounce {
    fn default() -> Self {
        Self::new(HOVER_OPEN_DELAY, HOVER_CLOSE_DELAY)
    }
}

impl HoverDebounce {
    pub fn new(open_delay: Duration, close_delay: Duration) -> Self {
        Self {
            open_delay,
            close_delay,
            committed: None,
            pending: None,
        }
    }

    pub fn pointer_entered(&mut self, target: HoverTarget, now: Instant) {
        if self.committed.as_ref() == Some(&target) {
            // Back on the open marker before its close fired.
            self.pending = None;
            return;
        }
        self.pending = Some((PendingChange::Open(target), now + self.open_delay));
    }

    pub fn pointer_left(&mut self, now: Instant) {
        match (&self.pending, &self.committed) {
            (Some((PendingChange::Open(_), _)), None) => self.pending = None,
            (_, Some(_)) => {
                self.pending = Some((PendingChange::Close, now + self.close_delay));
            }
            (_, None) => self.pending = None,
        }
    }

    /// Commits a due change. Returns true when the hovered marker changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = matches!(&self.pending, Some((_, deadline)) if *deadline <= now);
        if !due {
            return false;
        }
        let Some((change, _)) = self.pending.take() else {
            return false;
        };
        let next = match change {
            PendingChange::Open(target) => Some(target),
            PendingChange::Close => None,
        };
        let changed = next != self.committed;
        self.committed = next;
        changed
    }

    pub fn hovered(&self) -> Option<&HoverTarget> {
        self.committed.as_ref()
    }

    /// Key hovered inside the given message, if any.
    pub fn hovered_key_in(&self, message_key: &str) -> Option<u32> {
        self.committed
            .as_ref()
            .filter(|target| target.message_key == message_key)
            .map(|target| target.key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_skips_unterminated_marker() {
        assert_eq!(
            scan_markers("a<sup>1</sup> b<sup>2</sup> c<sup>3"),
            vec!["1", "2"]
        );
    }

    #[test]
    fn parse_takes_leading_digits() {
        assert_eq!(parse_marker_key("12abc"), Some(12));
        assert_eq!(parse_marker_key(" 7"), Some(7));
        assert_eq!(parse_marker_key("x1"), None);
        assert_eq!(parse_marker_key(""), None);
    }
}
