use egui::{Align2, Context, Id, Rect};

use crate::MapPosition;
use crate::overlay::panel;

/// User interaction with the meta panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaAction {
    /// Export the current map.
    Export,
    /// Clear the active region and zoom out.
    Reset,
}

/// Shows the reported viewport and the export and reset buttons.
pub struct MapMeta<'a> {
    /// The viewport held by the store.
    pub position: Option<&'a MapPosition>,
}

impl<'a> MapMeta<'a> {
    /// Creates the panel.
    pub fn new(position: Option<&'a MapPosition>) -> Self {
        Self { position }
    }

    /// A one line description of the viewport.
    pub fn describe(&self) -> String {
        match self.position {
            Some(position) => {
                let center = position.bounds.center();
                format!(
                    "zoom {}  {:.4}, {:.4}",
                    position.zoom, center.lat, center.lon
                )
            }
            None => "position unknown".to_string(),
        }
    }

    /// Renders the panel at the bottom center of `rect`.
    pub fn show(&self, ctx: &Context, id: Id, rect: Rect) -> Option<MetaAction> {
        panel(ctx, id, rect, Align2::CENTER_BOTTOM, |ui| {
            ui.horizontal(|ui| {
                ui.small(self.describe());
                let mut action = None;
                if ui.button("Export").clicked() {
                    action = Some(MetaAction::Export);
                }
                if ui.button("Reset").clicked() {
                    action = Some(MetaAction::Reset);
                }
                action
            })
            .inner
        })
    }
}
