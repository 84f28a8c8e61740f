use egui::{Align2, Color32, Context, Id, Rect, RichText, Sense, vec2};
use std::collections::BTreeMap;

use crate::overlay::panel;
use crate::requests::RequestType;

/// Shows the active region and how many requests of each selected category lie inside it.
pub struct MapOverview<'a> {
    /// The active region.
    pub region_name: &'a str,
    /// Counts per selected category.
    pub counts: &'a BTreeMap<RequestType, usize>,
}

impl<'a> MapOverview<'a> {
    /// Creates the panel.
    pub fn new(region_name: &'a str, counts: &'a BTreeMap<RequestType, usize>) -> Self {
        Self {
            region_name,
            counts,
        }
    }

    /// The number of requests over all selected categories.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Renders the panel in the top left corner of `rect`.
    pub fn show(&self, ctx: &Context, id: Id, rect: Rect) {
        panel(ctx, id, rect, Align2::LEFT_TOP, |ui| {
            ui.set_max_width(240.0);
            ui.label(RichText::new(self.region_name).heading().color(Color32::WHITE));
            ui.label(format!("{} requests", self.total()));
            ui.separator();

            egui::Grid::new(id.with("counts"))
                .num_columns(3)
                .spacing(vec2(6.0, 2.0))
                .show(ui, |ui| {
                    for (request_type, count) in self.counts {
                        let (swatch, _) = ui.allocate_exact_size(vec2(10.0, 10.0), Sense::hover());
                        ui.painter().circle_filled(swatch.center(), 5.0, request_type.color());
                        ui.label(request_type.display_name());
                        ui.label(count.to_string());
                        ui.end_row();
                    }
                });
        });
    }
}
