use egui::{Align2, Context, Id, Rect, RichText};
use std::collections::BTreeSet;

use crate::layers::requests::RequestsMode;
use crate::overlay::panel;
use crate::requests::RequestType;

/// User interaction with the layers panel.
#[derive(Clone, Debug, PartialEq)]
pub enum LayersAction {
    /// The set of shown categories changed.
    ChangeSelection(BTreeSet<RequestType>),
    /// The rendering of the requests changed.
    SetRequestsLayer(RequestsMode),
}

/// The legend: one checkbox per category and the circles/heatmap switch.
pub struct MapLayers<'a> {
    /// The shown categories.
    pub selected: &'a BTreeSet<RequestType>,
    /// The current rendering.
    pub mode: RequestsMode,
}

impl<'a> MapLayers<'a> {
    /// Creates the panel.
    pub fn new(selected: &'a BTreeSet<RequestType>, mode: RequestsMode) -> Self {
        Self { selected, mode }
    }

    /// The selection after toggling `request_type`.
    pub fn toggled(&self, request_type: RequestType) -> BTreeSet<RequestType> {
        let mut selected = self.selected.clone();
        if !selected.remove(&request_type) {
            selected.insert(request_type);
        }
        selected
    }

    /// Renders the panel in the bottom left corner of `rect`.
    pub fn show(&self, ctx: &Context, id: Id, rect: Rect) -> Vec<LayersAction> {
        panel(ctx, id, rect, Align2::LEFT_BOTTOM, |ui| {
            let mut actions = Vec::new();

            ui.horizontal(|ui| {
                for mode in [RequestsMode::Circles, RequestsMode::Heatmap] {
                    let label = match mode {
                        RequestsMode::Circles => "Points",
                        RequestsMode::Heatmap => "Heatmap",
                    };
                    if ui.radio(self.mode == mode, label).clicked() && self.mode != mode {
                        actions.push(LayersAction::SetRequestsLayer(mode));
                    }
                }
            });
            ui.separator();

            for request_type in RequestType::ALL {
                let mut checked = self.selected.contains(&request_type);
                let label = RichText::new(format!(
                    "{} ({})",
                    request_type.display_name(),
                    request_type.abbreviation()
                ))
                .color(request_type.color());
                if ui.checkbox(&mut checked, label).changed() {
                    actions.push(LayersAction::ChangeSelection(self.toggled(request_type)));
                }
            }

            ui.horizontal(|ui| {
                if ui.small_button("All").clicked() {
                    actions.push(LayersAction::ChangeSelection(
                        RequestType::ALL.into_iter().collect(),
                    ));
                }
                if ui.small_button("None").clicked() {
                    actions.push(LayersAction::ChangeSelection(BTreeSet::new()));
                }
            });

            actions
        })
    }
}
