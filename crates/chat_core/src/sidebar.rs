use crate::bus::{AppEvent, PanelOpenPayload};
use crate::source::{Provenance, ProvenanceResolver, SourceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTab {
    External,
    Internal,
}

impl SourceTab {
    fn matches(self, provenance: Provenance) -> bool {
        match self {
            SourceTab::External => provenance == Provenance::External,
            SourceTab::Internal => provenance == Provenance::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemClick {
    /// The owner installed an item delegate; it decides what happens.
    Delegated(SourceRecord),
    OpenUrl(String),
    Ignored,
}

/// State of the sources panel for one message's source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSidebar {
    entries: Vec<(SourceRecord, Provenance)>,
    active_tab: SourceTab,
    active_key: Option<u32>,
    delegate_item_clicks: bool,
}

impl SourceSidebar {
    /// Opens on `external` when any record resolves external, otherwise on
    /// `internal`.
    pub fn open(
        sources: Vec<SourceRecord>,
        active_key: Option<u32>,
        resolver: &ProvenanceResolver,
    ) -> Self {
        let entries: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let provenance = resolver.resolve(&source);
                (source, provenance)
            })
            .collect();
        let active_tab = if entries.iter().any(|(_, p)| p.is_external()) {
            SourceTab::External
        } else {
            SourceTab::Internal
        };
        Self {
            entries,
            active_tab,
            active_key,
            delegate_item_clicks: false,
        }
    }

    /// Routes item clicks to the owner instead of opening urls.
    pub fn with_item_delegate(mut self) -> Self {
        self.delegate_item_clicks = true;
        self
    }

    pub fn shows_same_sources(&self, sources: &[SourceRecord]) -> bool {
        self.entries.len() == sources.len()
            && self
                .entries
                .iter()
                .zip(sources)
                .all(|((entry, _), source)| entry == source)
    }

    /// Re-targets an already displayed set: the tab stays, the selection moves.
    pub fn select(&mut self, active_key: Option<u32>) {
        self.active_key = active_key;
    }

    pub fn set_tab(&mut self, tab: SourceTab) {
        self.active_tab = tab;
    }

    pub fn active_tab(&self) -> SourceTab {
        self.active_tab
    }

    pub fn active_key(&self) -> Option<u32> {
        self.active_key
    }

    /// Records of the active tab, in their original order.
    pub fn visible_sources(&self) -> Vec<&SourceRecord> {
        self.entries
            .iter()
            .filter(|(_, provenance)| self.active_tab.matches(*provenance))
            .map(|(source, _)| source)
            .collect()
    }

    pub fn count(&self, tab: SourceTab) -> usize {
        self.entries
            .iter()
            .filter(|(_, provenance)| tab.matches(*provenance))
            .count()
    }

    /// Event asking the panel owner to close every panel.
    pub fn close(&self) -> AppEvent {
        AppEvent::PanelOpen(PanelOpenPayload {
            panel: None,
            params: None,
        })
    }

    pub fn click_item(&self, key: u32) -> ItemClick {
        let Some((source, _)) = self.entries.iter().find(|(source, _)| source.key == key) else {
            return ItemClick::Ignored;
        };
        if self.delegate_item_clicks {
            return ItemClick::Delegated(source.clone());
        }
        match source.link() {
            Some(url) => ItemClick::OpenUrl(url.to_string()),
            None => ItemClick::Ignored,
        }
    }
}
