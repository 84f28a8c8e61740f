//! Panels drawn over the map once it is ready.
//!
//! Each panel is a small struct that renders itself into an [`egui::Area`] anchored to a corner of
//! the map and returns the user's actions instead of changing any state itself.

use egui::{Align2, Color32, Context, Frame, Id, Margin, Rect, Ui};

/// Region name and per-category counts.
pub mod overview;

/// Address and boundary search.
pub mod search;

/// Category selection and rendering mode.
pub mod legend;

/// Viewport readout, export and reset.
pub mod meta;

pub use legend::{LayersAction, MapLayers};
pub use meta::{MapMeta, MetaAction};
pub use overview::MapOverview;
pub use search::{GeocoderResult, MapSearch, ResultKind, SearchAction, SearchTab};

/// Distance between a panel and the map edge.
const PANEL_MARGIN: f32 = 10.0;

/// Shows `add_contents` in a framed area at the `align` corner of `rect`.
pub(crate) fn panel<R>(
    ctx: &Context,
    id: Id,
    rect: Rect,
    align: Align2,
    add_contents: impl FnOnce(&mut Ui) -> R,
) -> R {
    let frame = Frame::NONE
        .inner_margin(Margin::same(8))
        .fill(Color32::from_black_alpha(200))
        .corner_radius(4.0);

    egui::Area::new(id)
        .fixed_pos(align.pos_in_rect(&rect.shrink(PANEL_MARGIN)))
        .pivot(align)
        .show(ctx, |ui| {
            ui.visuals_mut().override_text_color = Some(Color32::from_gray(230));
            frame.show(ui, add_contents).inner
        })
        .inner
}
