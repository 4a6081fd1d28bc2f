use crate::bus::{PanelId, PanelParams};
use crate::sidebar::SourceSidebar;

/// The secondary surface currently shown. At most one is open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActivePanel {
    #[default]
    None,
    Sources(Box<SourceSidebar>),
    Canvas,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelState {
    active: ActivePanel,
    params: PanelParams,
}

impl PanelState {
    pub fn active(&self) -> &ActivePanel {
        &self.active
    }

    pub fn params(&self) -> &PanelParams {
        &self.params
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.active, ActivePanel::None)
    }

    pub fn sidebar(&self) -> Option<&SourceSidebar> {
        match &self.active {
            ActivePanel::Sources(sidebar) => Some(sidebar),
            _ => None,
        }
    }

    pub fn sidebar_mut(&mut self) -> Option<&mut SourceSidebar> {
        match &mut self.active {
            ActivePanel::Sources(sidebar) => Some(sidebar),
            _ => None,
        }
    }

    pub fn show_sources(&mut self, sidebar: SourceSidebar, params: PanelParams) {
        self.active = ActivePanel::Sources(Box::new(sidebar));
        self.params = params;
    }

    /// Applies a generic `panel:open` request. Opening `Source` without a
    /// source set keeps whatever sidebar is already shown.
    pub fn apply(&mut self, panel: Option<PanelId>, params: Option<PanelParams>) {
        match panel {
            None => self.close(),
            Some(PanelId::Canvas) => {
                self.active = ActivePanel::Canvas;
                self.params = params.unwrap_or_default();
            }
            Some(PanelId::Source) => {
                if let Some(params) = params {
                    self.params = params;
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.active = ActivePanel::None;
        self.params = PanelParams::default();
    }
}
